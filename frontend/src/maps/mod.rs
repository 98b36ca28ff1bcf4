//! 地图能力抽象
//!
//! 控制器（标记层、路线控制器、会话）只依赖这里的 trait：
//! - `MapCanvas`: 同步绘制原语（标记、折线、路线、信息窗、视口、弹窗）
//! - `MapServices`: 异步服务（反向地理编码、路线规划）
//! - `Scheduler`: 可取消的延时任务
//!
//! 浏览器中由 `google::GoogleMap` / `web::BrowserScheduler` 实现，
//! 测试中由 `mock::MockMap` / `mock::ManualScheduler` 实现。

use crate::error::MapResult;
use starmap_shared::{Bounds, LatLng, PlaceKey, TravelMode};
use std::fmt;
use std::time::Duration;

pub mod google;
#[cfg(test)]
pub mod mock;

// =========================================================
// 值类型
// =========================================================

/// 创建标记所需的信息
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub key: PlaceKey,
    pub position: LatLng,
    pub title: String,
    pub address: String,
}

/// 路线摘要（单个 leg）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteLeg {
    pub distance_text: String,
    pub duration_text: String,
    pub start_address: String,
    pub end_address: String,
}

/// 信息窗内容
#[derive(Debug, Clone, PartialEq)]
pub enum InfoContent {
    Place { name: String, address: String },
    /// `mode` 为 None 表示首次计算（标题为通用的 "Route"）
    Route {
        mode: Option<TravelMode>,
        leg: RouteLeg,
    },
    Notice { title: String, body: String },
}

impl InfoContent {
    pub fn notice(title: impl Into<String>, body: impl Into<String>) -> Self {
        InfoContent::Notice {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            InfoContent::Place { name, .. } => name.clone(),
            InfoContent::Route { mode: None, .. } => "Route".to_string(),
            InfoContent::Route { mode: Some(m), .. } => format!("{} route", m.display_name()),
            InfoContent::Notice { title, .. } => title.clone(),
        }
    }

    /// 纯文本行，渲染时逐行转义
    pub fn lines(&self) -> Vec<String> {
        match self {
            InfoContent::Place { address, .. } => vec![address.clone()],
            InfoContent::Route { leg, .. } => vec![
                format!("Distance: {}", leg.distance_text),
                format!("Duration: {}", leg.duration_text),
                format!("From: {}", leg.start_address),
                format!("To: {}", leg.end_address),
            ],
            InfoContent::Notice { body, .. } => vec![body.clone()],
        }
    }
}

/// 路线请求
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub origin: LatLng,
    pub destination: LatLng,
    pub mode: TravelMode,
    pub alternatives: bool,
    pub region: String,
}

/// 路线规划结果：摘要 + 提供方的渲染句柄
#[derive(Debug, Clone)]
pub struct RoutePlan<D> {
    pub leg: RouteLeg,
    pub directions: D,
}

/// 反向地理编码结果
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub formatted_address: String,
    pub place_id: Option<String>,
}

/// 地图服务的失败状态码
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    ZeroResults,
    OverQueryLimit,
    Other(String),
}

impl ProviderStatus {
    pub fn from_code(code: &str) -> Self {
        match code {
            "ZERO_RESULTS" => ProviderStatus::ZeroResults,
            "OVER_QUERY_LIMIT" => ProviderStatus::OverQueryLimit,
            other => ProviderStatus::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ProviderStatus::ZeroResults => "ZERO_RESULTS",
            ProviderStatus::OverQueryLimit => "OVER_QUERY_LIMIT",
            ProviderStatus::Other(code) => code,
        }
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =========================================================
// 能力 trait
// =========================================================

/// 同步绘制原语
pub trait MapCanvas {
    type Marker;
    type Overlay;
    type Directions;

    /// 高级标记（自定义 pin），失败时由调用方回退到 `create_legacy_marker`
    fn create_marker(&self, spec: &MarkerSpec) -> MapResult<Self::Marker>;
    fn create_legacy_marker(&self, spec: &MarkerSpec) -> Self::Marker;
    fn remove_marker(&self, marker: &Self::Marker);

    /// 移动（或首次创建）"当前位置" 标记
    fn set_current_location(&self, at: LatLng);

    fn draw_line(&self, from: LatLng, to: LatLng) -> Self::Overlay;
    fn remove_line(&self, overlay: &Self::Overlay);

    fn render_route(&self, directions: &Self::Directions);
    fn clear_route(&self);

    fn show_info(&self, at: LatLng, content: &InfoContent);
    fn close_info(&self);

    fn fit_bounds(&self, bounds: &Bounds);
    fn focus(&self, center: LatLng, zoom: u8);

    /// 模态提示
    fn alert(&self, message: &str);
}

/// 异步地图服务
#[async_trait::async_trait(?Send)]
pub trait MapServices: MapCanvas {
    async fn geocode(&self, at: LatLng) -> Result<Vec<GeocodeHit>, ProviderStatus>;
    async fn route(
        &self,
        request: &RouteRequest,
    ) -> Result<RoutePlan<Self::Directions>, ProviderStatus>;
}

/// 可取消的延时任务
///
/// 返回的句柄被 drop 时任务取消。
pub trait Scheduler {
    type Handle;

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Self::Handle;
}
