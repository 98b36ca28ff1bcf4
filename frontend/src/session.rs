//! 地图会话
//!
//! 单一持有者：地图句柄、地点存储、标记层、路线控制器、当前位置、登录用户。
//! 通过 Leptos context 传给各组件，不存在全局可变状态。
//!
//! 所有错误在这里就地处理（弹窗或信息窗），同时以 `MapResult` 返回给调用方记录日志。

use crate::config::AppConfig;
use crate::error::{MapError, MapErrorKind, MapResult};
use crate::gateway::{BackendGateway, HttpClient};
use crate::location::{GeolocationError, Position};
use crate::maps::{MapCanvas, MapServices, Scheduler};
use crate::markers::MarkerLayer;
use crate::places::PlaceStore;
use crate::route::{RouteController, RouteOptions, RouteOutcome, RoutePhase};
use starmap_shared::{LatLng, NewPlace, Place, PlaceId, PlaceKey, TravelMode, UserInfo};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to view your starred places.";
const SAVE_REQUIRES_LOGIN_MESSAGE: &str = "Please log in to save places.";
const ADD_FAILED_MESSAGE: &str = "Failed to add place. Please try again.";
const REMOVE_FAILED_MESSAGE: &str = "Failed to remove place. Please try again.";
const NO_GEOCODE_RESULTS_MESSAGE: &str = "No results found";

pub type PlacesListener = Box<dyn Fn(Vec<Place>)>;

struct SessionInner<C, P: MapCanvas, S: Scheduler> {
    config: AppConfig,
    gateway: BackendGateway<C>,
    map: Rc<P>,
    places: RefCell<PlaceStore>,
    markers: RefCell<MarkerLayer<P::Marker>>,
    route: Rc<RouteController<P, S>>,
    position: Cell<Option<LatLng>>,
    user: RefCell<Option<UserInfo>>,
    on_places: RefCell<Option<PlacesListener>>,
}

pub struct MapSession<C, P: MapCanvas, S: Scheduler> {
    inner: Rc<SessionInner<C, P, S>>,
}

impl<C, P: MapCanvas, S: Scheduler> Clone for MapSession<C, P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// 不持有会话的句柄，供地图回调捕获
pub struct WeakSession<C, P: MapCanvas, S: Scheduler> {
    inner: Weak<SessionInner<C, P, S>>,
}

impl<C, P: MapCanvas, S: Scheduler> WeakSession<C, P, S> {
    pub fn upgrade(&self) -> Option<MapSession<C, P, S>> {
        self.inner.upgrade().map(|inner| MapSession { inner })
    }
}

impl<C, P: MapCanvas, S: Scheduler> MapSession<C, P, S> {
    pub fn downgrade(&self) -> WeakSession<C, P, S> {
        WeakSession {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl<C, P, S> MapSession<C, P, S>
where
    C: HttpClient,
    P: MapServices + 'static,
    S: Scheduler + 'static,
{
    pub fn new(config: AppConfig, gateway: BackendGateway<C>, map: Rc<P>, scheduler: S) -> Self {
        let route = RouteController::new(map.clone(), scheduler, RouteOptions::from(&config));
        Self {
            inner: Rc::new(SessionInner {
                config,
                gateway,
                map,
                places: RefCell::new(PlaceStore::new()),
                markers: RefCell::new(MarkerLayer::new()),
                route,
                position: Cell::new(None),
                user: RefCell::new(None),
                on_places: RefCell::new(None),
            }),
        }
    }

    /// 地点集合变化时的回调（列表面板订阅）
    pub fn on_places_changed<F>(&self, listener: F)
    where
        F: Fn(Vec<Place>) + 'static,
    {
        *self.inner.on_places.borrow_mut() = Some(Box::new(listener));
    }

    fn notify_places(&self) {
        let snapshot = self.inner.places.borrow().snapshot();
        if let Some(listener) = self.inner.on_places.borrow().as_ref() {
            listener(snapshot);
        }
    }

    // --- Accessors ---

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.inner.user.borrow().clone()
    }

    pub fn places(&self) -> Vec<Place> {
        self.inner.places.borrow().snapshot()
    }

    pub fn marker_count(&self) -> usize {
        self.inner.markers.borrow().len()
    }

    pub fn current_position(&self) -> Option<LatLng> {
        self.inner.position.get()
    }

    pub fn route_phase(&self) -> RoutePhase {
        self.inner.route.phase()
    }

    // =========================================================
    // 会话与地点
    // =========================================================

    /// GET /userinfo；失败时视为未登录
    pub async fn fetch_session(&self) -> MapResult<UserInfo> {
        match self.inner.gateway.fetch_session().await {
            Ok(user) => {
                log_info!("[Session] Signed in as {}", user.name);
                *self.inner.user.borrow_mut() = Some(user.clone());
                Ok(user)
            }
            Err(e) => {
                log_info!("[Session] No active session: {}", e);
                *self.inner.user.borrow_mut() = None;
                Err(e.in_op("session.fetch"))
            }
        }
    }

    /// 从后端整体重新加载地点
    ///
    /// 未登录时直接返回空集合，不发请求。
    pub async fn load_places(&self) -> MapResult<Vec<Place>> {
        if self.inner.user.borrow().is_none() {
            log_info!("[Places] No session, skipping load");
            return Ok(Vec::new());
        }

        let rows = match self.inner.gateway.fetch_places().await {
            Ok(rows) => rows,
            Err(e) => {
                if e.kind == MapErrorKind::Unauthorized {
                    self.inner.map.alert(LOGIN_REQUIRED_MESSAGE);
                }
                let e = e.in_op("places.load");
                log_error!("[Places] {}", e);
                return Err(e);
            }
        };

        let kept = self.inner.places.borrow_mut().replace_all(rows);
        {
            let map = self.inner.map.as_ref();
            let mut markers = self.inner.markers.borrow_mut();
            markers.clear_all(map);
            for place in &kept {
                markers.upsert(map, place);
            }
            markers.fit_all_in_view(map, self.inner.config.focus_zoom);
        }

        log_info!("[Places] Loaded {} places", kept.len());
        self.notify_places();
        Ok(kept)
    }

    /// POST /add_place，成功后整体重新加载
    pub async fn add_place(&self, candidate: NewPlace) -> MapResult<()> {
        self.require_session()?;

        if let Err(e) = self.inner.gateway.add_place(&candidate).await {
            let e = e.in_op_with("places.add", candidate.key());
            log_error!("[Places] {}", e);
            self.inner.map.alert(ADD_FAILED_MESSAGE);
            return Err(e);
        }

        log_info!("[Places] Added {}", candidate.key());
        self.load_places().await.map(|_| ())
    }

    /// DELETE /remove_place/{id}，成功后才改动本地状态
    pub async fn remove_place(&self, id: PlaceId) -> MapResult<()> {
        if let Err(e) = self.inner.gateway.remove_place(id).await {
            let e = e.in_op_with("places.remove", id);
            log_error!("[Places] {}", e);
            self.inner.map.alert(REMOVE_FAILED_MESSAGE);
            return Err(e);
        }

        let removed = self.inner.places.borrow_mut().remove_by_id(id);
        if let Some(place) = removed {
            self.inner.markers.borrow_mut().remove_by_coordinate(
                self.inner.map.as_ref(),
                place.latitude,
                place.longitude,
            );
        }
        self.inner.route.clear();

        log_info!("[Places] Removed place {}", id);
        self.notify_places();
        Ok(())
    }

    /// 地图点击：反向地理编码后添加地点
    pub async fn handle_map_click(&self, at: LatLng) -> MapResult<()> {
        self.require_session()?;
        let at = at.normalized().map_err(|e| MapError::from(e).in_op("map.click"))?;

        let hits = match self.inner.map.geocode(at).await {
            Ok(hits) => hits,
            Err(status) => {
                let message = format!("Geocoder failed due to: {}", status);
                self.inner.map.alert(&message);
                return Err(MapError::geocode_failed(message).in_op_with("map.click", at));
            }
        };

        let Some(first) = hits.into_iter().next() else {
            self.inner.map.alert(NO_GEOCODE_RESULTS_MESSAGE);
            return Err(MapError::geocode_failed(NO_GEOCODE_RESULTS_MESSAGE)
                .in_op_with("map.click", at));
        };

        self.add_place(NewPlace::from_geocode(
            at,
            first.formatted_address,
            first.place_id,
        ))
        .await
    }

    fn require_session(&self) -> MapResult<()> {
        if self.inner.user.borrow().is_some() {
            return Ok(());
        }
        self.inner.map.alert(SAVE_REQUIRES_LOGIN_MESSAGE);
        Err(MapError::session_absent(SAVE_REQUIRES_LOGIN_MESSAGE))
    }

    // =========================================================
    // 路线
    // =========================================================

    /// 列表行点击：先移动视口到该地点，再计算路线
    pub async fn select_place(&self, key: &PlaceKey) -> MapResult<RouteOutcome> {
        let destination = match self.inner.places.borrow().get(key) {
            Some(place) => place.position(),
            None => return Ok(RouteOutcome::Unchanged),
        };

        self.inner
            .map
            .focus(destination, self.inner.config.focus_zoom);
        self.calculate_route(destination).await
    }

    pub async fn calculate_route(&self, destination: LatLng) -> MapResult<RouteOutcome> {
        self.inner
            .route
            .calculate_route(self.inner.position.get(), destination)
            .await
    }

    pub async fn change_travel_mode(&self, mode: TravelMode) -> MapResult<RouteOutcome> {
        self.inner.route.change_travel_mode(mode).await
    }

    // =========================================================
    // 定位
    // =========================================================

    /// 连续定位的每次更新：记录当前位置并移动 "当前位置" 标记
    pub fn update_position(&self, position: Position) {
        self.inner.position.set(Some(position.coords));
        self.inner.map.set_current_location(position.coords);
    }

    /// "定位到我" 控件：更新位置并平移过去
    pub fn recenter(&self, position: Position) {
        self.update_position(position);
        self.inner
            .map
            .focus(position.coords, self.inner.config.focus_zoom);
    }

    pub fn report_geolocation_error(&self, error: GeolocationError) {
        log_warn!("[Geolocation] {:?}: {}", error, error);
        self.inner.map.alert(error.user_message());
    }

    /// 页面卸载：清除路线与标记
    pub fn teardown(&self) {
        self.inner.route.clear();
        self.inner
            .markers
            .borrow_mut()
            .clear_all(self.inner.map.as_ref());
    }
}

#[cfg(test)]
mod tests;
