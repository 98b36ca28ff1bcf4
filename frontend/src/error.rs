use std::fmt;

use starmap_shared::CoordinateError;

// =========================================================
// 错误种类枚举
// =========================================================

/// 错误种类
/// 决定错误的语义以及向用户展示的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapErrorKind {
    /// 未登录：不加载、不写入任何地点
    SessionAbsent,
    /// 当前位置尚未获取
    NoOrigin,
    GeolocationDenied,
    GeolocationUnavailable,
    GeolocationTimeout,
    GeolocationUnknown,
    /// 坐标非数值或超出范围
    InvalidCoordinate,
    GeocodeFailed,
    RouteZeroResults,
    RouteOverQueryLimit,
    RouteOtherFailure,
    /// 后端返回非 2xx
    BackendUnavailable,
    /// 后端返回 401
    Unauthorized,
    /// fetch 本身失败（断网、CORS 等）
    Network,
    /// JSON / JsValue 转换失败
    Serialization,
    /// 高级标记创建失败（会回退到普通标记）
    MarkerFailed,
}

impl MapErrorKind {
    /// 机器可读的错误代码
    pub fn code(&self) -> &'static str {
        match self {
            MapErrorKind::SessionAbsent => "SESSION_ABSENT",
            MapErrorKind::NoOrigin => "NO_ORIGIN",
            MapErrorKind::GeolocationDenied => "GEOLOCATION_DENIED",
            MapErrorKind::GeolocationUnavailable => "GEOLOCATION_UNAVAILABLE",
            MapErrorKind::GeolocationTimeout => "GEOLOCATION_TIMEOUT",
            MapErrorKind::GeolocationUnknown => "GEOLOCATION_UNKNOWN",
            MapErrorKind::InvalidCoordinate => "INVALID_COORDINATE",
            MapErrorKind::GeocodeFailed => "GEOCODE_FAILED",
            MapErrorKind::RouteZeroResults => "ZERO_RESULTS",
            MapErrorKind::RouteOverQueryLimit => "OVER_QUERY_LIMIT",
            MapErrorKind::RouteOtherFailure => "ROUTE_FAILED",
            MapErrorKind::BackendUnavailable => "BACKEND_UNAVAILABLE",
            MapErrorKind::Unauthorized => "UNAUTHORIZED",
            MapErrorKind::Network => "NETWORK_ERROR",
            MapErrorKind::Serialization => "SERIALIZATION_ERROR",
            MapErrorKind::MarkerFailed => "MARKER_FAILED",
        }
    }
}

// =========================================================
// 核心错误类型
// =========================================================

/// 客户端领域错误
///
/// - kind: 错误种类
/// - message: 错误消息
/// - spans: 操作追踪，如 `gateway.send("/places")` -> `places.load`
#[derive(Debug, Clone, PartialEq)]
pub struct MapError {
    pub kind: MapErrorKind,
    pub message: String,
    spans: Vec<String>,
}

impl MapError {
    pub fn new(kind: MapErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            spans: Vec::new(),
        }
    }

    // --- Convenience constructors ---

    pub fn session_absent(message: impl Into<String>) -> Self {
        Self::new(MapErrorKind::SessionAbsent, message)
    }

    pub fn no_origin(message: impl Into<String>) -> Self {
        Self::new(MapErrorKind::NoOrigin, message)
    }

    pub fn invalid_coordinate(message: impl Into<String>) -> Self {
        Self::new(MapErrorKind::InvalidCoordinate, message)
    }

    pub fn geocode_failed(message: impl Into<String>) -> Self {
        Self::new(MapErrorKind::GeocodeFailed, message)
    }

    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        let kind = if status == 401 {
            MapErrorKind::Unauthorized
        } else {
            MapErrorKind::BackendUnavailable
        };
        Self::new(kind, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(MapErrorKind::Network, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(MapErrorKind::Serialization, message)
    }

    pub fn marker_failed(message: impl Into<String>) -> Self {
        Self::new(MapErrorKind::MarkerFailed, message)
    }

    // --- Context builders ---

    /// 添加操作追踪
    pub fn in_op(mut self, operation: impl Into<String>) -> Self {
        self.spans.push(operation.into());
        self
    }

    /// 添加操作追踪（带额外细节）
    pub fn in_op_with(mut self, operation: impl AsRef<str>, detail: impl fmt::Display) -> Self {
        self.spans.push(format!("{}({})", operation.as_ref(), detail));
        self
    }

    // --- Accessors ---

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn spans(&self) -> &[String] {
        &self.spans
    }
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if !self.spans.is_empty() {
            write!(f, " | trace: {}", self.spans.join(" -> "))?;
        }
        Ok(())
    }
}

impl std::error::Error for MapError {}

pub type MapResult<T> = std::result::Result<T, MapError>;

// =========================================================
// 类型转换实现
// =========================================================

impl From<CoordinateError> for MapError {
    fn from(e: CoordinateError) -> Self {
        MapError::invalid_coordinate(e.to_string())
    }
}

impl From<crate::serde_helper::Error> for MapError {
    fn from(e: crate::serde_helper::Error) -> Self {
        MapError::serialization(e.to_string())
    }
}

impl From<serde_json::Error> for MapError {
    fn from(e: serde_json::Error) -> Self {
        MapError::serialization(e.to_string())
    }
}

impl From<gloo_net::Error> for MapError {
    fn from(e: gloo_net::Error) -> Self {
        MapError::network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_trace() {
        let err = MapError::backend(500, "boom")
            .in_op_with("gateway.send", "/places")
            .in_op("places.load");

        assert_eq!(err.kind, MapErrorKind::BackendUnavailable);
        assert_eq!(
            err.to_string(),
            "[BACKEND_UNAVAILABLE] boom | trace: gateway.send(/places) -> places.load"
        );
    }

    #[test]
    fn test_backend_401_is_unauthorized() {
        assert_eq!(
            MapError::backend(401, "nope").kind,
            MapErrorKind::Unauthorized
        );
    }

    #[test]
    fn test_coordinate_error_maps_to_invalid_coordinate() {
        let err: MapError = CoordinateError::LatitudeOutOfRange(91.0).into();
        assert_eq!(err.kind, MapErrorKind::InvalidCoordinate);
    }
}
