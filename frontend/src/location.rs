//! 定位模型
//!
//! 浏览器 Geolocation API 的纯 Rust 侧类型：位置、错误分类、请求参数。
//! 实际的 watch / 单次查询封装在 `web::geolocation`。

use crate::error::{MapError, MapErrorKind};
use starmap_shared::LatLng;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub coords: LatLng,
    /// 精度半径（米）
    pub accuracy: f64,
}

/// 定位请求参数：高精度、超时、不复用缓存位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl TrackerOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            high_accuracy: true,
            timeout,
            maximum_age: Duration::ZERO,
        }
    }
}

/// 定位错误，按 W3C `GeolocationPositionError.code` 分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationError {
    PermissionDenied,
    Unavailable,
    Timeout,
    Unknown,
}

impl GeolocationError {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            2 => GeolocationError::Unavailable,
            3 => GeolocationError::Timeout,
            _ => GeolocationError::Unknown,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            GeolocationError::PermissionDenied => "Location permission was denied.",
            GeolocationError::Unavailable => "Location information is unavailable.",
            GeolocationError::Timeout => "The location request timed out.",
            GeolocationError::Unknown => "An unknown error occurred while locating you.",
        }
    }

    pub fn kind(&self) -> MapErrorKind {
        match self {
            GeolocationError::PermissionDenied => MapErrorKind::GeolocationDenied,
            GeolocationError::Unavailable => MapErrorKind::GeolocationUnavailable,
            GeolocationError::Timeout => MapErrorKind::GeolocationTimeout,
            GeolocationError::Unknown => MapErrorKind::GeolocationUnknown,
        }
    }
}

impl fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

impl From<GeolocationError> for MapError {
    fn from(e: GeolocationError) -> Self {
        MapError::new(e.kind(), e.user_message())
    }
}
