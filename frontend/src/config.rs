//! 运行时配置模块
//!
//! 编译期默认值 + 浏览器 LocalStorage 覆盖项。

use starmap_shared::LatLng;
use std::time::Duration;

// =========================================================
// 默认值
// =========================================================

/// 后端与页面同源
pub const DEFAULT_API_BASE: &str = "";
pub const DEFAULT_MAP_ID: &str = "starmap_default_map";
/// 首尔市厅
pub const DEFAULT_CENTER: LatLng = LatLng::new(37.5665, 126.978);
pub const DEFAULT_ZOOM: u8 = 13;
/// 单个标记、列表选中时使用的近景缩放级别
pub const FOCUS_ZOOM: u8 = 15;
pub const DEFAULT_REGION: &str = "KR";
pub const FALLBACK_OVERLAY_TTL: Duration = Duration::from_secs(5);
pub const PROXIMITY_THRESHOLD_METERS: f64 = 10.0;
pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(5);

// LocalStorage 覆盖键
const STORAGE_MAP_ID_KEY: &str = "starmap_map_id";
const STORAGE_API_BASE_KEY: &str = "starmap_api_base";
const STORAGE_REGION_KEY: &str = "starmap_region";

/// 应用配置
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// 后端 API 前缀，空字符串表示同源
    pub api_base: String,
    pub map_id: String,
    pub default_center: LatLng,
    pub default_zoom: u8,
    pub focus_zoom: u8,
    /// 路线请求的国家/地区提示
    pub region: String,
    pub fallback_ttl: Duration,
    pub proximity_threshold_m: f64,
    pub geolocation_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            map_id: DEFAULT_MAP_ID.to_string(),
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
            focus_zoom: FOCUS_ZOOM,
            region: DEFAULT_REGION.to_string(),
            fallback_ttl: FALLBACK_OVERLAY_TTL,
            proximity_threshold_m: PROXIMITY_THRESHOLD_METERS,
            geolocation_timeout: GEOLOCATION_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// 从 LocalStorage 读取覆盖项（仅浏览器环境）
    pub fn load() -> Self {
        use gloo_storage::{LocalStorage, Storage};

        Self::default().with_overrides(|key| LocalStorage::raw().get_item(key).ok().flatten())
    }

    /// 应用覆盖项；空白值被忽略
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(map_id) = value(STORAGE_MAP_ID_KEY) {
            self.map_id = map_id;
        }
        if let Some(base) = value(STORAGE_API_BASE_KEY) {
            self.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(region) = value(STORAGE_REGION_KEY) {
            self.region = region.to_uppercase();
        }
        self
    }
}
