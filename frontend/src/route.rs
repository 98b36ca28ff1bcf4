//! 路线控制器
//!
//! 状态机：`Idle -> Calculating -> {Rendered | Fallback}`，`Fallback` 在超时后回到 `Idle`。
//!
//! - 每次请求领取递增的令牌，只有最新令牌的响应会被应用（last-request-wins）
//! - 直线覆盖层的到期任务由控制器持有，离开 `Fallback` 时 drop 句柄即取消
//! - `RefCell` 借用从不跨越 `.await`

use crate::config::AppConfig;
use crate::error::{MapError, MapErrorKind, MapResult};
use crate::maps::{
    InfoContent, MapCanvas, MapServices, ProviderStatus, RouteLeg, RouteRequest, Scheduler,
};
use starmap_shared::{Bounds, LatLng, TravelMode};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

const NO_ORIGIN_MESSAGE: &str = "Your current location is not available yet.";
const UNAVAILABLE_TITLE: &str = "Route unavailable";
const ZERO_RESULTS_MESSAGE: &str = "No route found. Please try another travel mode.";
const OVER_QUERY_LIMIT_MESSAGE: &str = "Please try again later.";
const GENERIC_FAILURE_MESSAGE: &str = "Unable to calculate a route.";
const TOO_CLOSE_TITLE: &str = "Destination too close";
const TOO_CLOSE_MESSAGE: &str = "Your current location and the destination are almost the same.";

// =========================================================
// 状态
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePhase {
    Idle,
    Calculating,
    Rendered,
    Fallback,
}

/// 一次路线调用的结果（失败走 `Err`）
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Rendered(RouteLeg),
    /// 起点与终点距离小于阈值，只显示提示
    TooClose,
    /// 在等待期间有更新的请求发出，本次响应被丢弃
    Superseded,
    /// 没有已渲染的路线，切换出行方式被忽略
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteOptions {
    pub region: String,
    pub fallback_ttl: Duration,
    pub proximity_threshold_m: f64,
}

impl From<&AppConfig> for RouteOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            region: config.region.clone(),
            fallback_ttl: config.fallback_ttl,
            proximity_threshold_m: config.proximity_threshold_m,
        }
    }
}

struct RouteState<O, H> {
    phase: RoutePhase,
    token: u64,
    /// 临时 / 回退直线
    overlay: Option<O>,
    expiry: Option<H>,
    /// 已渲染路线的端点，切换出行方式时复用
    endpoints: Option<(LatLng, LatLng)>,
    mode: TravelMode,
}

// =========================================================
// 控制器
// =========================================================

pub struct RouteController<P: MapCanvas, S: Scheduler> {
    map: Rc<P>,
    scheduler: S,
    options: RouteOptions,
    state: RefCell<RouteState<P::Overlay, S::Handle>>,
    this: Weak<Self>,
}

impl<P, S> RouteController<P, S>
where
    P: MapServices + 'static,
    S: Scheduler + 'static,
{
    pub fn new(map: Rc<P>, scheduler: S, options: RouteOptions) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            map,
            scheduler,
            options,
            state: RefCell::new(RouteState {
                phase: RoutePhase::Idle,
                token: 0,
                overlay: None,
                expiry: None,
                endpoints: None,
                mode: TravelMode::Driving,
            }),
            this: this.clone(),
        })
    }

    pub fn phase(&self) -> RoutePhase {
        self.state.borrow().phase
    }

    pub fn has_overlay(&self) -> bool {
        self.state.borrow().overlay.is_some()
    }

    pub fn mode(&self) -> TravelMode {
        self.state.borrow().mode
    }

    /// 计算并渲染从 `origin` 到 `destination` 的驾车路线
    pub async fn calculate_route(
        &self,
        origin: Option<LatLng>,
        destination: LatLng,
    ) -> MapResult<RouteOutcome> {
        self.discard_overlay();

        let Some(origin) = origin else {
            self.map.alert(NO_ORIGIN_MESSAGE);
            return Err(MapError::no_origin(NO_ORIGIN_MESSAGE).in_op("route.calculate"));
        };

        let (origin, destination) = match (origin.normalized(), destination.normalized()) {
            (Ok(o), Ok(d)) => (o, d),
            (Err(e), _) | (_, Err(e)) => {
                let err = MapError::from(e).in_op_with("route.calculate", destination);
                self.map.alert(&err.message);
                return Err(err);
            }
        };

        if origin.distance_to(&destination) < self.options.proximity_threshold_m {
            // 旧路线与在途请求一并失效
            self.clear();
            self.map.show_info(
                destination,
                &InfoContent::notice(TOO_CLOSE_TITLE, TOO_CLOSE_MESSAGE),
            );
            return Ok(RouteOutcome::TooClose);
        }

        let token = {
            let mut state = self.state.borrow_mut();
            state.token += 1;
            state.phase = RoutePhase::Calculating;
            state.endpoints = None;
            state.mode = TravelMode::Driving;
            state.overlay = Some(self.map.draw_line(origin, destination));
            state.token
        };
        self.map.clear_route();

        log_info!(
            "[Route] #{} calculating {} -> {}",
            token,
            origin,
            destination
        );
        let request = self.request(origin, destination, TravelMode::Driving);
        let result = self.map.route(&request).await;

        if !self.is_current(token) {
            log_info!("[Route] #{} superseded, response discarded", token);
            return Ok(RouteOutcome::Superseded);
        }

        match result {
            Ok(plan) => {
                let overlay = {
                    let mut state = self.state.borrow_mut();
                    state.phase = RoutePhase::Rendered;
                    state.endpoints = Some((origin, destination));
                    state.overlay.take()
                };
                if let Some(overlay) = overlay {
                    self.map.remove_line(&overlay);
                }
                self.present(&plan.directions, None, &plan.leg, origin, destination);
                Ok(RouteOutcome::Rendered(plan.leg))
            }
            Err(status) => {
                let (kind, message) = classify(&status);
                log_warn!("[Route] #{} failed: {}", token, status);

                self.map
                    .show_info(destination, &InfoContent::notice(UNAVAILABLE_TITLE, message));
                self.enter_fallback(token);
                Err(MapError::new(kind, message).in_op_with("route.calculate", status))
            }
        }
    }

    /// 以新的出行方式重新规划当前已渲染的路线
    ///
    /// 没有已渲染路线时为空操作；失败时保留原路线。
    pub async fn change_travel_mode(&self, mode: TravelMode) -> MapResult<RouteOutcome> {
        let (token, origin, destination) = {
            let mut state = self.state.borrow_mut();
            let (RoutePhase::Rendered, Some((origin, destination))) =
                (state.phase, state.endpoints)
            else {
                return Ok(RouteOutcome::Unchanged);
            };
            state.token += 1;
            (state.token, origin, destination)
        };

        log_info!("[Route] #{} switching to {}", token, mode.provider_code());
        let request = self.request(origin, destination, mode);
        let result = self.map.route(&request).await;

        if !self.is_current(token) {
            return Ok(RouteOutcome::Superseded);
        }

        match result {
            Ok(plan) => {
                self.state.borrow_mut().mode = mode;
                self.present(
                    &plan.directions,
                    Some(mode),
                    &plan.leg,
                    origin,
                    destination,
                );
                Ok(RouteOutcome::Rendered(plan.leg))
            }
            Err(status) => {
                let message = unreachable_message(mode, &status);
                log_warn!("[Route] #{} {} failed: {}", token, mode.provider_code(), status);
                self.map.show_info(
                    destination,
                    &InfoContent::notice(UNAVAILABLE_TITLE, message.clone()),
                );
                let (kind, _) = classify(&status);
                Err(MapError::new(kind, message).in_op_with("route.change_mode", mode.provider_code()))
            }
        }
    }

    /// 清除路线、覆盖层和到期任务，回到 `Idle`，并使在途请求失效
    pub fn clear(&self) {
        let overlay = {
            let mut state = self.state.borrow_mut();
            state.token += 1;
            state.phase = RoutePhase::Idle;
            state.endpoints = None;
            state.expiry = None;
            state.overlay.take()
        };
        if let Some(overlay) = overlay {
            self.map.remove_line(&overlay);
        }
        self.map.clear_route();
    }

    /// 到期任务回调：仅当令牌仍然有效且处于 `Fallback` 时移除直线
    pub fn expire_fallback(&self, token: u64) {
        let overlay = {
            let mut state = self.state.borrow_mut();
            if state.token != token || state.phase != RoutePhase::Fallback {
                return;
            }
            state.phase = RoutePhase::Idle;
            state.expiry = None;
            state.overlay.take()
        };
        if let Some(overlay) = overlay {
            self.map.remove_line(&overlay);
        }
    }

    // --- internal ---

    fn request(&self, origin: LatLng, destination: LatLng, mode: TravelMode) -> RouteRequest {
        RouteRequest {
            origin,
            destination,
            mode,
            alternatives: true,
            region: self.options.region.clone(),
        }
    }

    fn is_current(&self, token: u64) -> bool {
        self.state.borrow().token == token
    }

    fn present(
        &self,
        directions: &P::Directions,
        mode: Option<TravelMode>,
        leg: &RouteLeg,
        origin: LatLng,
        destination: LatLng,
    ) {
        self.map.render_route(directions);
        self.map.show_info(
            destination,
            &InfoContent::Route {
                mode,
                leg: leg.clone(),
            },
        );
        if let Some(bounds) = Bounds::around([origin, destination]) {
            self.map.fit_bounds(&bounds);
        }
    }

    /// 移除任何现存直线并取消到期任务
    fn discard_overlay(&self) {
        let overlay = {
            let mut state = self.state.borrow_mut();
            state.expiry = None;
            if state.phase == RoutePhase::Fallback {
                state.phase = RoutePhase::Idle;
            }
            state.overlay.take()
        };
        if let Some(overlay) = overlay {
            self.map.remove_line(&overlay);
        }
    }

    fn enter_fallback(&self, token: u64) {
        let this = self.this.clone();
        let handle = self.scheduler.schedule(
            self.options.fallback_ttl,
            Box::new(move || {
                if let Some(controller) = this.upgrade() {
                    controller.expire_fallback(token);
                }
            }),
        );

        let mut state = self.state.borrow_mut();
        state.phase = RoutePhase::Fallback;
        state.expiry = Some(handle);
    }
}

fn classify(status: &ProviderStatus) -> (MapErrorKind, &'static str) {
    match status {
        ProviderStatus::ZeroResults => (MapErrorKind::RouteZeroResults, ZERO_RESULTS_MESSAGE),
        ProviderStatus::OverQueryLimit => {
            (MapErrorKind::RouteOverQueryLimit, OVER_QUERY_LIMIT_MESSAGE)
        }
        ProviderStatus::Other(_) => (MapErrorKind::RouteOtherFailure, GENERIC_FAILURE_MESSAGE),
    }
}

fn unreachable_message(mode: TravelMode, status: &ProviderStatus) -> String {
    match status {
        ProviderStatus::ZeroResults => format!(
            "This place can't be reached by {}. Please choose another travel mode.",
            mode.display_name()
        ),
        _ => format!("No {} route could be found.", mode.display_name()),
    }
}
