//! 测试用内存地图与调度器
//!
//! `MockMap` 记录每一次绘制调用，路线/地理编码响应按队列预设；
//! `ManualScheduler` 由测试手动触发到期任务。

use super::*;
use crate::error::MapError;
use futures::channel::oneshot;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

pub type RouteResult = Result<RoutePlan<String>, ProviderStatus>;

enum RouteScript {
    Ready(RouteResult),
    Deferred(oneshot::Receiver<RouteResult>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockMarker {
    pub id: u32,
    pub key: PlaceKey,
    pub legacy: bool,
}

/// 最近一次视口调整
#[derive(Debug, Clone, PartialEq)]
pub enum Viewport {
    Fit(Bounds),
    Focus(LatLng, u8),
}

#[derive(Default)]
pub struct MockMap {
    next_id: Cell<u32>,
    fail_advanced: Cell<bool>,

    pub markers: RefCell<BTreeMap<u32, MockMarker>>,
    pub lines: RefCell<BTreeMap<u32, (LatLng, LatLng)>>,
    pub rendered: RefCell<Option<String>>,
    pub info: RefCell<Option<(LatLng, InfoContent)>>,
    pub viewport: RefCell<Option<Viewport>>,
    pub current_location: Cell<Option<LatLng>>,
    pub alerts: RefCell<Vec<String>>,

    pub route_requests: RefCell<Vec<RouteRequest>>,
    pub geocode_requests: RefCell<Vec<LatLng>>,
    routes: RefCell<VecDeque<RouteScript>>,
    geocodes: RefCell<VecDeque<Result<Vec<GeocodeHit>, ProviderStatus>>>,
}

impl MockMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    /// 之后的高级标记创建全部失败
    pub fn fail_advanced_markers(&self) {
        self.fail_advanced.set(true);
    }

    /// 预设一次成功的路线，directions 标签用于断言渲染的是哪条
    pub fn push_route_ok(&self, label: &str) {
        self.routes
            .borrow_mut()
            .push_back(RouteScript::Ready(Ok(plan(label))));
    }

    pub fn push_route_err(&self, status: ProviderStatus) {
        self.routes
            .borrow_mut()
            .push_back(RouteScript::Ready(Err(status)));
    }

    /// 预设一次延迟响应，由返回的 sender 决定何时、以何结果完成
    pub fn push_route_deferred(&self) -> oneshot::Sender<RouteResult> {
        let (tx, rx) = oneshot::channel();
        self.routes
            .borrow_mut()
            .push_back(RouteScript::Deferred(rx));
        tx
    }

    pub fn push_geocode(&self, result: Result<Vec<GeocodeHit>, ProviderStatus>) {
        self.geocodes.borrow_mut().push_back(result);
    }

    // --- Inspection ---

    pub fn marker_keys(&self) -> Vec<PlaceKey> {
        self.markers
            .borrow()
            .values()
            .map(|m| m.key.clone())
            .collect()
    }

    pub fn line_count(&self) -> usize {
        self.lines.borrow().len()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }

    pub fn info_title(&self) -> Option<String> {
        self.info.borrow().as_ref().map(|(_, c)| c.title())
    }

    pub fn route_call_count(&self) -> usize {
        self.route_requests.borrow().len()
    }
}

/// 带标签的路线结果
pub fn plan(label: &str) -> RoutePlan<String> {
    RoutePlan {
        leg: RouteLeg {
            distance_text: format!("{label} km"),
            duration_text: format!("{label} mins"),
            start_address: "Origin St".to_string(),
            end_address: "Destination Ave".to_string(),
        },
        directions: label.to_string(),
    }
}

impl MapCanvas for MockMap {
    type Marker = MockMarker;
    type Overlay = u32;
    type Directions = String;

    fn create_marker(&self, spec: &MarkerSpec) -> MapResult<MockMarker> {
        if self.fail_advanced.get() {
            return Err(MapError::marker_failed("advanced markers unavailable"));
        }
        let marker = MockMarker {
            id: self.next_id(),
            key: spec.key.clone(),
            legacy: false,
        };
        self.markers.borrow_mut().insert(marker.id, marker.clone());
        Ok(marker)
    }

    fn create_legacy_marker(&self, spec: &MarkerSpec) -> MockMarker {
        let marker = MockMarker {
            id: self.next_id(),
            key: spec.key.clone(),
            legacy: true,
        };
        self.markers.borrow_mut().insert(marker.id, marker.clone());
        marker
    }

    fn remove_marker(&self, marker: &MockMarker) {
        self.markers.borrow_mut().remove(&marker.id);
    }

    fn set_current_location(&self, at: LatLng) {
        self.current_location.set(Some(at));
    }

    fn draw_line(&self, from: LatLng, to: LatLng) -> u32 {
        let id = self.next_id();
        self.lines.borrow_mut().insert(id, (from, to));
        id
    }

    fn remove_line(&self, overlay: &u32) {
        self.lines.borrow_mut().remove(overlay);
    }

    fn render_route(&self, directions: &String) {
        *self.rendered.borrow_mut() = Some(directions.clone());
    }

    fn clear_route(&self) {
        *self.rendered.borrow_mut() = None;
    }

    fn show_info(&self, at: LatLng, content: &InfoContent) {
        *self.info.borrow_mut() = Some((at, content.clone()));
    }

    fn close_info(&self) {
        *self.info.borrow_mut() = None;
    }

    fn fit_bounds(&self, bounds: &Bounds) {
        *self.viewport.borrow_mut() = Some(Viewport::Fit(*bounds));
    }

    fn focus(&self, center: LatLng, zoom: u8) {
        *self.viewport.borrow_mut() = Some(Viewport::Focus(center, zoom));
    }

    fn alert(&self, message: &str) {
        self.alerts.borrow_mut().push(message.to_string());
    }
}

#[async_trait::async_trait(?Send)]
impl MapServices for MockMap {
    async fn geocode(&self, at: LatLng) -> Result<Vec<GeocodeHit>, ProviderStatus> {
        self.geocode_requests.borrow_mut().push(at);
        let scripted = self.geocodes.borrow_mut().pop_front();
        scripted.unwrap_or_else(|| Err(ProviderStatus::Other("UNSCRIPTED".to_string())))
    }

    async fn route(&self, request: &RouteRequest) -> RouteResult {
        self.route_requests.borrow_mut().push(request.clone());
        // 先释放借用再 await
        let script = self.routes.borrow_mut().pop_front();
        match script {
            Some(RouteScript::Ready(result)) => result,
            Some(RouteScript::Deferred(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(ProviderStatus::Other("CANCELLED".to_string()))),
            None => Err(ProviderStatus::Other("UNSCRIPTED".to_string())),
        }
    }
}

// =========================================================
// ManualScheduler
// =========================================================

type TaskQueue = Rc<RefCell<BTreeMap<u64, (Duration, Box<dyn FnOnce()>)>>>;

/// 手动触发的调度器，任务只在 `fire_all` 时执行
#[derive(Clone, Default)]
pub struct ManualScheduler {
    next_id: Rc<Cell<u64>>,
    tasks: TaskQueue,
}

/// 被 drop 时把任务从队列中移除
pub struct ManualHandle {
    id: u64,
    tasks: TaskQueue,
}

impl Drop for ManualHandle {
    fn drop(&mut self) {
        self.tasks.borrow_mut().remove(&self.id);
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn pending_delays(&self) -> Vec<Duration> {
        self.tasks.borrow().values().map(|(d, _)| *d).collect()
    }

    /// 执行当前所有到期任务
    pub fn fire_all(&self) {
        let due: Vec<_> = std::mem::take(&mut *self.tasks.borrow_mut())
            .into_values()
            .collect();
        for (_, task) in due {
            task();
        }
    }
}

impl Scheduler for ManualScheduler {
    type Handle = ManualHandle;

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> ManualHandle {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.tasks.borrow_mut().insert(id, (delay, task));
        ManualHandle {
            id,
            tasks: self.tasks.clone(),
        }
    }
}
