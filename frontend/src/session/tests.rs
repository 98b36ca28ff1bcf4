use super::*;
use crate::gateway::MockHttpClient;
use crate::maps::mock::{ManualScheduler, MockMap, Viewport};
use crate::maps::{GeocodeHit, ProviderStatus};
use starmap_shared::protocol::HttpMethod;

type TestSession = MapSession<MockHttpClient, MockMap, ManualScheduler>;

const USER_JSON: &str = r#"{"name": "Kim", "profile_image": null}"#;
const TWO_PLACES: &str = r#"[
    {"place_id": 1, "name": "City Hall", "address": "Seoul", "latitude": 37.5665, "longitude": 126.978},
    {"place_id": 2, "name": "Namsan", "address": "Seoul", "latitude": 37.5512, "longitude": 126.9882}
]"#;
const HERE: Position = Position {
    coords: LatLng::new(37.57, 126.98),
    accuracy: 12.0,
};

fn setup() -> (MockHttpClient, Rc<MockMap>, TestSession) {
    let client = MockHttpClient::new();
    let map = Rc::new(MockMap::new());
    let session = MapSession::new(
        AppConfig::default(),
        BackendGateway::new(client.clone(), ""),
        map.clone(),
        ManualScheduler::new(),
    );
    (client, map, session)
}

async fn sign_in(client: &MockHttpClient, session: &TestSession) {
    client.mock_response(HttpMethod::Get, "/userinfo", 200, USER_JSON);
    session.fetch_session().await.unwrap();
}

// =========================================================
// 会话
// =========================================================

#[tokio::test]
async fn test_fetch_session_failure_leaves_user_absent() {
    let (client, _, session) = setup();
    client.mock_response(HttpMethod::Get, "/userinfo", 401, "");

    assert!(session.fetch_session().await.is_err());
    assert!(session.user().is_none());
}

#[tokio::test]
async fn test_load_without_session_makes_no_request() {
    let (client, map, session) = setup();

    let places = session.load_places().await.unwrap();

    assert!(places.is_empty());
    assert!(client.requests().is_empty());
    assert!(map.markers.borrow().is_empty());
}

// =========================================================
// 加载
// =========================================================

#[tokio::test]
async fn test_load_creates_markers_fits_view_and_notifies() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(HttpMethod::Get, "/places", 200, TWO_PLACES);

    let notified = Rc::new(RefCell::new(Vec::new()));
    let sink = notified.clone();
    session.on_places_changed(move |places| *sink.borrow_mut() = places);

    let places = session.load_places().await.unwrap();

    assert_eq!(places.len(), 2);
    assert_eq!(session.marker_count(), 2);
    assert_eq!(map.markers.borrow().len(), 2);
    assert!(matches!(*map.viewport.borrow(), Some(Viewport::Fit(_))));
    assert_eq!(notified.borrow().len(), 2);
}

#[tokio::test]
async fn test_reload_replaces_previous_set() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(HttpMethod::Get, "/places", 200, TWO_PLACES);
    client.mock_response(
        HttpMethod::Get,
        "/places",
        200,
        r#"[{"place_id": 3, "name": "Busan", "latitude": 35.1796, "longitude": 129.0756}]"#,
    );

    session.load_places().await.unwrap();
    session.load_places().await.unwrap();

    assert_eq!(session.places().len(), 1);
    assert_eq!(map.marker_keys(), vec![PlaceKey::new(35.1796, 129.0756)]);
    assert_eq!(
        *map.viewport.borrow(),
        Some(Viewport::Focus(LatLng::new(35.1796, 129.0756), 15))
    );
}

#[tokio::test]
async fn test_duplicate_coordinates_collapse_to_one_entry() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(
        HttpMethod::Get,
        "/places",
        200,
        r#"[
            {"place_id": 1, "name": "A", "latitude": 37.5, "longitude": 127.0},
            {"place_id": 2, "name": "B", "latitude": 37.5, "longitude": 127.0}
        ]"#,
    );

    session.load_places().await.unwrap();

    assert_eq!(session.places().len(), 1);
    assert_eq!(session.places()[0].name, "A");
    assert_eq!(map.markers.borrow().len(), 1);
}

#[tokio::test]
async fn test_load_401_prompts_login() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(HttpMethod::Get, "/places", 401, r#"{"error": "User not logged in"}"#);

    let err = session.load_places().await.unwrap_err();

    assert_eq!(err.kind, MapErrorKind::Unauthorized);
    assert_eq!(map.alerts(), vec![LOGIN_REQUIRED_MESSAGE]);
}

#[tokio::test]
async fn test_load_server_error_is_logged_only() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(HttpMethod::Get, "/places", 500, "boom");

    let err = session.load_places().await.unwrap_err();

    assert_eq!(err.kind, MapErrorKind::BackendUnavailable);
    assert!(map.alerts().is_empty());
}

// =========================================================
// 添加
// =========================================================

#[tokio::test]
async fn test_add_without_session_is_rejected_locally() {
    let (client, map, session) = setup();

    let err = session
        .add_place(NewPlace::from_geocode(LatLng::new(37.0, 127.0), "X".into(), None))
        .await
        .unwrap_err();

    assert_eq!(err.kind, MapErrorKind::SessionAbsent);
    assert!(client.requests().is_empty());
    assert_eq!(map.alerts(), vec![SAVE_REQUIRES_LOGIN_MESSAGE]);
}

#[tokio::test]
async fn test_add_success_triggers_full_reload() {
    let (client, _, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(HttpMethod::Post, "/add_place", 200, r#"{"message": "ok"}"#);
    client.mock_response(HttpMethod::Get, "/places", 200, TWO_PLACES);

    session
        .add_place(NewPlace::from_geocode(
            LatLng::new(37.5512, 126.9882),
            "Namsan".into(),
            Some("pid".into()),
        ))
        .await
        .unwrap();

    assert_eq!(
        client.request_lines(),
        vec!["GET /userinfo", "POST /add_place", "GET /places"]
    );
    assert_eq!(session.places().len(), 2);
}

#[tokio::test]
async fn test_adding_existing_key_creates_no_duplicate() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(HttpMethod::Get, "/places", 200, TWO_PLACES);
    session.load_places().await.unwrap();

    // 后端接受了重复坐标，重新加载后仍只有一条
    client.mock_response(HttpMethod::Post, "/add_place", 200, r#"{"message": "ok"}"#);
    client.mock_response(
        HttpMethod::Get,
        "/places",
        200,
        r#"[
            {"place_id": 1, "name": "City Hall", "latitude": 37.5665, "longitude": 126.978},
            {"place_id": 2, "name": "Namsan", "latitude": 37.5512, "longitude": 126.9882},
            {"place_id": 3, "name": "City Hall again", "latitude": 37.5665, "longitude": 126.978}
        ]"#,
    );
    session
        .add_place(NewPlace::from_geocode(
            LatLng::new(37.5665, 126.978),
            "City Hall".into(),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(session.places().len(), 2);
    assert_eq!(map.markers.borrow().len(), 2);
}

#[tokio::test]
async fn test_add_failure_leaves_store_unchanged() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(HttpMethod::Get, "/places", 200, TWO_PLACES);
    session.load_places().await.unwrap();
    client.mock_response(HttpMethod::Post, "/add_place", 500, r#"{"error": "db"}"#);

    let err = session
        .add_place(NewPlace::from_geocode(LatLng::new(35.0, 129.0), "X".into(), None))
        .await
        .unwrap_err();

    assert_eq!(err.kind, MapErrorKind::BackendUnavailable);
    assert_eq!(map.alerts(), vec![ADD_FAILED_MESSAGE]);
    assert_eq!(session.places().len(), 2);
    assert_eq!(
        client.request_lines().last().map(String::as_str),
        Some("POST /add_place")
    );
}

// =========================================================
// 删除
// =========================================================

#[tokio::test]
async fn test_remove_success_drops_entry_marker_and_route() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(HttpMethod::Get, "/places", 200, TWO_PLACES);
    session.load_places().await.unwrap();
    session.update_position(HERE);
    map.push_route_ok("drive");
    session
        .calculate_route(LatLng::new(37.5512, 126.9882))
        .await
        .unwrap();
    client.mock_response(HttpMethod::Delete, "/remove_place/2", 200, r#"{"message": "ok"}"#);

    session.remove_place(PlaceId(2)).await.unwrap();

    assert_eq!(session.places().len(), 1);
    assert_eq!(map.marker_keys(), vec![PlaceKey::new(37.5665, 126.978)]);
    assert!(map.rendered.borrow().is_none());
    assert_eq!(session.route_phase(), RoutePhase::Idle);
}

#[tokio::test]
async fn test_rejected_remove_changes_nothing() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(HttpMethod::Get, "/places", 200, TWO_PLACES);
    session.load_places().await.unwrap();
    session.update_position(HERE);
    map.push_route_ok("drive");
    session
        .calculate_route(LatLng::new(37.5512, 126.9882))
        .await
        .unwrap();
    client.mock_response(HttpMethod::Delete, "/remove_place/2", 403, "");

    let err = session.remove_place(PlaceId(2)).await.unwrap_err();

    assert_eq!(err.kind, MapErrorKind::BackendUnavailable);
    assert_eq!(map.alerts(), vec![REMOVE_FAILED_MESSAGE]);
    assert_eq!(session.places().len(), 2);
    assert_eq!(map.markers.borrow().len(), 2);
    assert_eq!(map.rendered.borrow().as_deref(), Some("drive"));
    assert_eq!(session.route_phase(), RoutePhase::Rendered);
}

// =========================================================
// 地图点击
// =========================================================

#[tokio::test]
async fn test_map_click_geocodes_and_adds() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    map.push_geocode(Ok(vec![GeocodeHit {
        formatted_address: "1 Sejong-daero, Seoul".to_string(),
        place_id: Some("ChIJ".to_string()),
    }]));
    client.mock_response(HttpMethod::Post, "/add_place", 200, r#"{"message": "ok"}"#);
    client.mock_response(HttpMethod::Get, "/places", 200, "[]");

    session
        .handle_map_click(LatLng::new(37.5665, 126.978))
        .await
        .unwrap();

    let requests = client.requests();
    let body: serde_json::Value =
        serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
    assert_eq!(body["name"], "1 Sejong-daero, Seoul");
    assert_eq!(body["address"], "1 Sejong-daero, Seoul");
    assert_eq!(body["google_place_id"], "ChIJ");
    assert_eq!(body["latitude"], 37.5665);
}

#[tokio::test]
async fn test_map_click_without_results_alerts() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    map.push_geocode(Ok(Vec::new()));

    let err = session
        .handle_map_click(LatLng::new(37.0, 127.0))
        .await
        .unwrap_err();

    assert_eq!(err.kind, MapErrorKind::GeocodeFailed);
    assert_eq!(map.alerts(), vec![NO_GEOCODE_RESULTS_MESSAGE]);
    assert_eq!(client.request_lines(), vec!["GET /userinfo"]);
}

#[tokio::test]
async fn test_map_click_geocoder_failure_reports_status() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    map.push_geocode(Err(ProviderStatus::OverQueryLimit));

    let err = session
        .handle_map_click(LatLng::new(37.0, 127.0))
        .await
        .unwrap_err();

    assert_eq!(err.kind, MapErrorKind::GeocodeFailed);
    assert_eq!(
        map.alerts(),
        vec!["Geocoder failed due to: OVER_QUERY_LIMIT"]
    );
}

// =========================================================
// 选择与定位
// =========================================================

#[tokio::test]
async fn test_select_place_focuses_then_routes_from_current_position() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(HttpMethod::Get, "/places", 200, TWO_PLACES);
    session.load_places().await.unwrap();
    session.update_position(HERE);
    let tx = map.push_route_deferred();

    let key = PlaceKey::new(37.5512, 126.9882);
    let (outcome, _) = futures::join!(session.select_place(&key), async {
        // 路线仍在计算中，视口已经移动到目标
        assert_eq!(
            *map.viewport.borrow(),
            Some(Viewport::Focus(LatLng::new(37.5512, 126.9882), 15))
        );
        let _ = tx.send(Ok(crate::maps::mock::plan("drive")));
    });

    assert!(matches!(outcome.unwrap(), RouteOutcome::Rendered(_)));
    assert_eq!(map.route_requests.borrow()[0].origin, HERE.coords);
}

#[tokio::test]
async fn test_select_place_without_position_alerts_no_origin() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(HttpMethod::Get, "/places", 200, TWO_PLACES);
    session.load_places().await.unwrap();

    let err = session
        .select_place(&PlaceKey::new(37.5512, 126.9882))
        .await
        .unwrap_err();

    assert_eq!(err.kind, MapErrorKind::NoOrigin);
    assert_eq!(map.alerts().len(), 1);
    assert_eq!(map.route_call_count(), 0);
}

#[tokio::test]
async fn test_select_unknown_place_is_noop() {
    let (_, map, session) = setup();

    let outcome = session
        .select_place(&PlaceKey::new(1.0, 1.0))
        .await
        .unwrap();

    assert_eq!(outcome, RouteOutcome::Unchanged);
    assert!(map.viewport.borrow().is_none());
}

#[tokio::test]
async fn test_position_updates_move_current_marker() {
    let (_, map, session) = setup();

    session.update_position(HERE);
    let moved = Position {
        coords: LatLng::new(37.58, 126.99),
        accuracy: 5.0,
    };
    session.update_position(moved);

    assert_eq!(session.current_position(), Some(moved.coords));
    assert_eq!(map.current_location.get(), Some(moved.coords));
}

#[tokio::test]
async fn test_recenter_pans_to_position() {
    let (_, map, session) = setup();

    session.recenter(HERE);

    assert_eq!(
        *map.viewport.borrow(),
        Some(Viewport::Focus(HERE.coords, 15))
    );
}

#[tokio::test]
async fn test_geolocation_error_shows_distinct_message() {
    let (_, map, session) = setup();

    session.report_geolocation_error(GeolocationError::PermissionDenied);
    session.report_geolocation_error(GeolocationError::Timeout);

    let alerts = map.alerts();
    assert_eq!(alerts.len(), 2);
    assert_ne!(alerts[0], alerts[1]);
}

#[tokio::test]
async fn test_teardown_clears_markers() {
    let (client, map, session) = setup();
    sign_in(&client, &session).await;
    client.mock_response(HttpMethod::Get, "/places", 200, TWO_PLACES);
    session.load_places().await.unwrap();

    session.teardown();

    assert_eq!(session.marker_count(), 0);
    assert!(map.markers.borrow().is_empty());
}

#[tokio::test]
async fn test_weak_handle_does_not_keep_session_alive() {
    let (client, map, session) = setup();
    let weak = session.downgrade();

    sign_in(&client, &session).await;
    assert!(weak.upgrade().is_some_and(|s| s.user().is_some()));

    session.teardown();
    drop(session);

    assert!(weak.upgrade().is_none());
    // 地图本身仍由调用方持有
    assert_eq!(Rc::strong_count(&map), 1);
}
