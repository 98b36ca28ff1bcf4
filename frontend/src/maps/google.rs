//! Google Maps JavaScript SDK 绑定
//!
//! `sys` 子模块是 wasm-bindgen 的 extern 声明；`GoogleMap` 在其之上实现
//! `MapCanvas` / `MapServices`。页面需要以 `libraries=marker` 加载 SDK。

use super::*;
use crate::config::AppConfig;
use crate::error::{MapError, MapErrorKind};
use crate::serde_helper;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

mod sys {
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        #[derive(Clone)]
        pub type Map;
        #[wasm_bindgen(constructor, catch, js_namespace = ["google", "maps"])]
        pub fn new(element: &web_sys::HtmlElement, options: &JsValue) -> Result<Map, JsValue>;
        #[wasm_bindgen(method, js_name = fitBounds)]
        pub fn fit_bounds(this: &Map, bounds: &JsValue);
        #[wasm_bindgen(method, js_name = panTo)]
        pub fn pan_to(this: &Map, position: &JsValue);
        #[wasm_bindgen(method, js_name = setZoom)]
        pub fn set_zoom(this: &Map, zoom: f64);
        #[wasm_bindgen(method, js_name = addListener)]
        pub fn add_listener(this: &Map, event: &str, handler: &js_sys::Function) -> JsValue;

        /// `google.maps.LatLng` 实例（地图点击事件中的 `latLng`）
        #[wasm_bindgen(js_namespace = ["google", "maps"], js_name = LatLng)]
        pub type LatLngObject;
        #[wasm_bindgen(method)]
        pub fn lat(this: &LatLngObject) -> f64;
        #[wasm_bindgen(method)]
        pub fn lng(this: &LatLngObject) -> f64;

        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        pub type Marker;
        #[wasm_bindgen(constructor, js_namespace = ["google", "maps"])]
        pub fn new(options: &JsValue) -> Marker;
        #[wasm_bindgen(method, js_name = setMap)]
        pub fn set_map(this: &Marker, map: Option<&Map>);
        #[wasm_bindgen(method, js_name = setPosition)]
        pub fn set_position(this: &Marker, position: &JsValue);
        #[wasm_bindgen(method, js_name = addListener)]
        pub fn add_listener(this: &Marker, event: &str, handler: &js_sys::Function) -> JsValue;

        #[wasm_bindgen(js_namespace = ["google", "maps", "marker"])]
        pub type AdvancedMarkerElement;
        #[wasm_bindgen(constructor, catch, js_namespace = ["google", "maps", "marker"])]
        pub fn new(options: &JsValue) -> Result<AdvancedMarkerElement, JsValue>;
        #[wasm_bindgen(method, setter = map)]
        pub fn set_map(this: &AdvancedMarkerElement, map: Option<&Map>);
        #[wasm_bindgen(method, setter = position)]
        pub fn set_position(this: &AdvancedMarkerElement, position: &JsValue);
        #[wasm_bindgen(method, js_name = addListener)]
        pub fn add_listener(
            this: &AdvancedMarkerElement,
            event: &str,
            handler: &js_sys::Function,
        ) -> JsValue;

        #[wasm_bindgen(js_namespace = ["google", "maps", "marker"])]
        pub type PinElement;
        #[wasm_bindgen(constructor, catch, js_namespace = ["google", "maps", "marker"])]
        pub fn new(options: &JsValue) -> Result<PinElement, JsValue>;
        #[wasm_bindgen(method, getter)]
        pub fn element(this: &PinElement) -> JsValue;

        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        pub type Polyline;
        #[wasm_bindgen(constructor, js_namespace = ["google", "maps"])]
        pub fn new(options: &JsValue) -> Polyline;
        #[wasm_bindgen(method, js_name = setMap)]
        pub fn set_map(this: &Polyline, map: Option<&Map>);

        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        #[derive(Clone)]
        pub type InfoWindow;
        #[wasm_bindgen(constructor, js_namespace = ["google", "maps"])]
        pub fn new() -> InfoWindow;
        #[wasm_bindgen(method, js_name = setContent)]
        pub fn set_content(this: &InfoWindow, content: &str);
        #[wasm_bindgen(method, js_name = setPosition)]
        pub fn set_position(this: &InfoWindow, position: &JsValue);
        #[wasm_bindgen(method)]
        pub fn open(this: &InfoWindow, map: &Map);
        #[wasm_bindgen(method)]
        pub fn close(this: &InfoWindow);

        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        pub type Geocoder;
        #[wasm_bindgen(constructor, js_namespace = ["google", "maps"])]
        pub fn new() -> Geocoder;
        #[wasm_bindgen(method)]
        pub fn geocode(this: &Geocoder, request: &JsValue) -> js_sys::Promise;

        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        pub type DirectionsService;
        #[wasm_bindgen(constructor, js_namespace = ["google", "maps"])]
        pub fn new() -> DirectionsService;
        #[wasm_bindgen(method)]
        pub fn route(this: &DirectionsService, request: &JsValue) -> js_sys::Promise;

        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        pub type DirectionsRenderer;
        #[wasm_bindgen(constructor, js_namespace = ["google", "maps"])]
        pub fn new(options: &JsValue) -> DirectionsRenderer;
        #[wasm_bindgen(method, js_name = setMap)]
        pub fn set_map(this: &DirectionsRenderer, map: Option<&Map>);
        #[wasm_bindgen(method, js_name = setDirections)]
        pub fn set_directions(this: &DirectionsRenderer, directions: &JsValue);
    }
}

// =========================================================
// 请求 / 响应 DTO
// =========================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MapOptions<'a> {
    center: LatLng,
    zoom: u8,
    map_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PinStyle {
    background: &'static str,
    border_color: &'static str,
    glyph_color: &'static str,
}

const PLACE_PIN: PinStyle = PinStyle {
    background: "#4285F4",
    border_color: "#1A73E8",
    glyph_color: "#FFFFFF",
};

const CURRENT_LOCATION_PIN: PinStyle = PinStyle {
    background: "#EA4335",
    border_color: "#B31412",
    glyph_color: "#FFFFFF",
};

#[derive(Serialize)]
struct LegacyMarkerOptions<'a> {
    position: LatLng,
    title: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PolylineOptions {
    path: [LatLng; 2],
    geodesic: bool,
    stroke_color: &'static str,
    stroke_opacity: f64,
    stroke_weight: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DirectionsRequest<'a> {
    origin: LatLng,
    destination: LatLng,
    travel_mode: &'a str,
    provide_route_alternatives: bool,
    /// `google.maps.UnitSystem.METRIC`
    unit_system: u8,
    region: &'a str,
}

/// 起终点由自定义标记表示，不绘制默认 A/B 标记
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RendererOptions {
    suppress_markers: bool,
}

const RENDERER_OPTIONS: RendererOptions = RendererOptions {
    suppress_markers: true,
};

#[derive(Serialize)]
struct GeocodeRequest {
    location: LatLng,
}

#[derive(Deserialize)]
struct TextValue {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct LegDto {
    distance: Option<TextValue>,
    duration: Option<TextValue>,
    #[serde(default)]
    start_address: String,
    #[serde(default)]
    end_address: String,
}

#[derive(Deserialize)]
struct RouteDto {
    #[serde(default)]
    legs: Vec<LegDto>,
}

#[derive(Deserialize)]
struct DirectionsResultDto {
    #[serde(default)]
    routes: Vec<RouteDto>,
}

#[derive(Deserialize)]
struct GeocodeResultDto {
    formatted_address: String,
    place_id: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeResponseDto {
    #[serde(default)]
    results: Vec<GeocodeResultDto>,
}

impl From<LegDto> for RouteLeg {
    fn from(leg: LegDto) -> Self {
        RouteLeg {
            distance_text: leg.distance.map(|d| d.text).unwrap_or_default(),
            duration_text: leg.duration.map(|d| d.text).unwrap_or_default(),
            start_address: leg.start_address,
            end_address: leg.end_address,
        }
    }
}

// =========================================================
// 句柄类型
// =========================================================

enum MarkerKind {
    Advanced(sys::AdvancedMarkerElement),
    Legacy(sys::Marker),
}

pub struct GoogleMarker {
    kind: MarkerKind,
    _on_click: Option<Closure<dyn FnMut()>>,
}

impl GoogleMarker {
    fn detach(&self) {
        match &self.kind {
            MarkerKind::Advanced(el) => el.set_map(None),
            MarkerKind::Legacy(marker) => marker.set_map(None),
        }
    }

    fn move_to(&self, position: &JsValue) {
        match &self.kind {
            MarkerKind::Advanced(el) => el.set_position(position),
            MarkerKind::Legacy(marker) => marker.set_position(position),
        }
    }
}

pub struct GoogleLine(sys::Polyline);

/// `DirectionsResult` 原始对象，交给 `DirectionsRenderer` 渲染
pub struct GoogleDirections(JsValue);

// =========================================================
// GoogleMap
// =========================================================

pub struct GoogleMap {
    map: sys::Map,
    info: sys::InfoWindow,
    geocoder: sys::Geocoder,
    directions: sys::DirectionsService,
    renderer: sys::DirectionsRenderer,
    current_location: RefCell<Option<GoogleMarker>>,
    click_listener: RefCell<Option<Closure<dyn FnMut(JsValue)>>>,
}

impl GoogleMap {
    pub fn new(element: &web_sys::HtmlElement, config: &AppConfig) -> MapResult<Self> {
        let options = serde_helper::to_value(&MapOptions {
            center: config.default_center,
            zoom: config.default_zoom,
            map_id: &config.map_id,
        })?;
        let map = sys::Map::new(element, &options).map_err(|e| {
            MapError::new(
                MapErrorKind::Network,
                format!("Google Maps SDK is not available: {:?}", e),
            )
            .in_op("google.new")
        })?;

        log_info!("[Maps] Map created with id {}", config.map_id);
        Ok(Self {
            map,
            info: sys::InfoWindow::new(),
            geocoder: sys::Geocoder::new(),
            directions: sys::DirectionsService::new(),
            renderer: sys::DirectionsRenderer::new(&serde_helper::to_value(&RENDERER_OPTIONS)?),
            current_location: RefCell::new(None),
            click_listener: RefCell::new(None),
        })
    }

    /// 注册地图点击回调（只保留最后一个）
    pub fn on_click<F>(&self, handler: F)
    where
        F: Fn(LatLng) + 'static,
    {
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            let Ok(lat_lng) = js_sys::Reflect::get(&event, &JsValue::from_str("latLng")) else {
                return;
            };
            if lat_lng.is_undefined() || lat_lng.is_null() {
                return;
            }
            let lat_lng: sys::LatLngObject = lat_lng.unchecked_into();
            handler(LatLng::new(lat_lng.lat(), lat_lng.lng()));
        });
        self.map
            .add_listener("click", closure.as_ref().unchecked_ref());
        *self.click_listener.borrow_mut() = Some(closure);
    }

    fn marker_click(&self, position: LatLng, content: InfoContent) -> Closure<dyn FnMut()> {
        let map = self.map.clone();
        let info = self.info.clone();
        Closure::<dyn FnMut()>::new(move || {
            open_info(&map, &info, position, &content);
            map.pan_to(&literal(&position));
        })
    }

    fn advanced_marker(
        &self,
        position: LatLng,
        title: &str,
        style: &PinStyle,
    ) -> MapResult<sys::AdvancedMarkerElement> {
        let pin = sys::PinElement::new(&serde_helper::to_value(style)?)
            .map_err(|e| MapError::marker_failed(format!("{:?}", e)).in_op("google.pin"))?;
        let map: &JsValue = self.map.as_ref();
        let options = serde_helper::object(&[
            ("map", map),
            ("position", &literal(&position)),
            ("title", &JsValue::from_str(title)),
            ("content", &pin.element()),
        ])?;
        sys::AdvancedMarkerElement::new(&options)
            .map_err(|e| MapError::marker_failed(format!("{:?}", e)).in_op("google.marker"))
    }

    fn legacy_marker(&self, position: LatLng, title: &str) -> sys::Marker {
        let marker = sys::Marker::new(&literal(&LegacyMarkerOptions { position, title }));
        marker.set_map(Some(&self.map));
        marker
    }
}

/// 序列化为 JS 字面量；纯数据结构不会失败，失败时记录并传 undefined
fn literal<T: Serialize>(value: &T) -> JsValue {
    serde_helper::to_value(value).unwrap_or_else(|e| {
        log_error!("[Maps] Failed to build literal: {}", e);
        JsValue::UNDEFINED
    })
}

fn open_info(map: &sys::Map, info: &sys::InfoWindow, at: LatLng, content: &InfoContent) {
    info.set_content(&render_info(content));
    info.set_position(&literal(&at));
    info.open(map);
}

/// 信息窗 HTML，所有文本均转义
fn render_info(content: &InfoContent) -> String {
    let mut html = format!(
        r#"<div style="padding: 10px;"><h3>{}</h3>"#,
        escape_html(&content.title())
    );
    for line in content.lines() {
        html.push_str(&format!("<p>{}</p>", escape_html(&line)));
    }
    html.push_str("</div>");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// 被拒绝的 Promise 带有 `code` 字段（如 `ZERO_RESULTS`）
fn rejection_status(err: &JsValue) -> ProviderStatus {
    serde_helper::string_field(err, "code")
        .map(|code| ProviderStatus::from_code(&code))
        .unwrap_or_else(|| ProviderStatus::Other("UNKNOWN_ERROR".to_string()))
}

impl MapCanvas for GoogleMap {
    type Marker = GoogleMarker;
    type Overlay = GoogleLine;
    type Directions = GoogleDirections;

    fn create_marker(&self, spec: &MarkerSpec) -> MapResult<GoogleMarker> {
        let el = self.advanced_marker(spec.position, &spec.title, &PLACE_PIN)?;
        let on_click = self.marker_click(
            spec.position,
            InfoContent::Place {
                name: spec.title.clone(),
                address: spec.address.clone(),
            },
        );
        el.add_listener("click", on_click.as_ref().unchecked_ref());
        Ok(GoogleMarker {
            kind: MarkerKind::Advanced(el),
            _on_click: Some(on_click),
        })
    }

    fn create_legacy_marker(&self, spec: &MarkerSpec) -> GoogleMarker {
        let marker = self.legacy_marker(spec.position, &spec.title);
        let on_click = self.marker_click(
            spec.position,
            InfoContent::Place {
                name: spec.title.clone(),
                address: spec.address.clone(),
            },
        );
        marker.add_listener("click", on_click.as_ref().unchecked_ref());
        GoogleMarker {
            kind: MarkerKind::Legacy(marker),
            _on_click: Some(on_click),
        }
    }

    fn remove_marker(&self, marker: &GoogleMarker) {
        marker.detach();
    }

    fn set_current_location(&self, at: LatLng) {
        let mut current = self.current_location.borrow_mut();
        if let Some(marker) = current.as_ref() {
            marker.move_to(&literal(&at));
            return;
        }

        let kind = match self.advanced_marker(at, "Current location", &CURRENT_LOCATION_PIN) {
            Ok(el) => MarkerKind::Advanced(el),
            Err(e) => {
                log_warn!("[Maps] Current location pin fallback: {}", e);
                MarkerKind::Legacy(self.legacy_marker(at, "Current location"))
            }
        };
        *current = Some(GoogleMarker {
            kind,
            _on_click: None,
        });
    }

    fn draw_line(&self, from: LatLng, to: LatLng) -> GoogleLine {
        let line = sys::Polyline::new(&literal(&PolylineOptions {
            path: [from, to],
            geodesic: true,
            stroke_color: "#FF0000",
            stroke_opacity: 0.5,
            stroke_weight: 2,
        }));
        line.set_map(Some(&self.map));
        GoogleLine(line)
    }

    fn remove_line(&self, overlay: &GoogleLine) {
        overlay.0.set_map(None);
    }

    fn render_route(&self, directions: &GoogleDirections) {
        self.renderer.set_map(Some(&self.map));
        self.renderer.set_directions(&directions.0);
    }

    fn clear_route(&self) {
        self.renderer.set_map(None);
    }

    fn show_info(&self, at: LatLng, content: &InfoContent) {
        open_info(&self.map, &self.info, at, content);
    }

    fn close_info(&self) {
        self.info.close();
    }

    fn fit_bounds(&self, bounds: &Bounds) {
        self.map.fit_bounds(&literal(bounds));
    }

    fn focus(&self, center: LatLng, zoom: u8) {
        self.map.pan_to(&literal(&center));
        self.map.set_zoom(f64::from(zoom));
    }

    fn alert(&self, message: &str) {
        crate::web::dialog::alert(message);
    }
}

#[async_trait::async_trait(?Send)]
impl MapServices for GoogleMap {
    async fn geocode(&self, at: LatLng) -> Result<Vec<GeocodeHit>, ProviderStatus> {
        let request = serde_helper::to_value(&GeocodeRequest { location: at })
            .map_err(|e| ProviderStatus::Other(e.to_string()))?;
        let response = JsFuture::from(self.geocoder.geocode(&request))
            .await
            .map_err(|e| rejection_status(&e))?;
        let response: GeocodeResponseDto = serde_helper::from_value(response)
            .map_err(|e| ProviderStatus::Other(e.to_string()))?;

        Ok(response
            .results
            .into_iter()
            .map(|r| GeocodeHit {
                formatted_address: r.formatted_address,
                place_id: r.place_id,
            })
            .collect())
    }

    async fn route(
        &self,
        request: &RouteRequest,
    ) -> Result<RoutePlan<GoogleDirections>, ProviderStatus> {
        let js_request = serde_helper::to_value(&DirectionsRequest {
            origin: request.origin,
            destination: request.destination,
            travel_mode: request.mode.provider_code(),
            provide_route_alternatives: request.alternatives,
            unit_system: 0,
            region: &request.region,
        })
        .map_err(|e| ProviderStatus::Other(e.to_string()))?;

        let result = JsFuture::from(self.directions.route(&js_request))
            .await
            .map_err(|e| rejection_status(&e))?;
        let parsed: DirectionsResultDto = serde_helper::from_value(result.clone())
            .map_err(|e| ProviderStatus::Other(e.to_string()))?;

        let leg = parsed
            .routes
            .into_iter()
            .next()
            .and_then(|route| route.legs.into_iter().next())
            .ok_or(ProviderStatus::ZeroResults)?;

        Ok(RoutePlan {
            leg: leg.into(),
            directions: GoogleDirections(result),
        })
    }
}
