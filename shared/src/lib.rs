use serde::{Deserialize, Serialize};
use std::fmt;

pub mod geo;
pub mod protocol;

pub use geo::{Bounds, CoordinateError, LatLng};

// =========================================================
// 常量定义 (Constants)
// =========================================================

pub const LOGIN_PATH: &str = "/login";
pub const LOGOUT_PATH: &str = "/logout";
pub const DEFAULT_PROFILE_IMAGE: &str = "/static/default-profile.png";

// =========================================================
// 身份键 (Identity Key)
// =========================================================

/// 坐标身份键 `"lat,lng"`
///
/// 精确浮点匹配，没有容差：相距几毫米的两个地点被视为不同地点。
/// 数字采用最短往返十进制表示（`127.0` -> `"127"`），与浏览器端的数字字符串化一致。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceKey(String);

impl PlaceKey {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self(format!("{},{}", format_coordinate(lat), format_coordinate(lng)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<LatLng> for PlaceKey {
    fn from(p: LatLng) -> Self {
        Self::new(p.lat, p.lng)
    }
}

impl fmt::Display for PlaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn format_coordinate(v: f64) -> String {
    // -0.0 与 0.0 视为同一个键
    if v == 0.0 {
        "0".to_string()
    } else {
        v.to_string()
    }
}

// =========================================================
// 领域模型 (Domain Models)
// =========================================================

/// 后端分配的地点 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(pub i64);

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 已收藏的地点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(rename = "place_id")]
    pub id: PlaceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "google_place_id", default)]
    pub external_place_id: Option<String>,
}

impl Place {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    pub fn key(&self) -> PlaceKey {
        PlaceKey::new(self.latitude, self.longitude)
    }
}

/// 待添加的地点（由逆地理编码结果生成）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlace {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "google_place_id")]
    pub external_place_id: Option<String>,
}

impl NewPlace {
    /// 名称默认使用格式化地址
    pub fn from_geocode(at: LatLng, formatted_address: String, place_id: Option<String>) -> Self {
        Self {
            name: formatted_address.clone(),
            address: formatted_address,
            latitude: at.lat,
            longitude: at.lng,
            external_place_id: place_id,
        }
    }

    pub fn key(&self) -> PlaceKey {
        PlaceKey::new(self.latitude, self.longitude)
    }
}

/// 登录用户信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl UserInfo {
    /// 头像地址，缺失时使用默认头像
    pub fn avatar_url(&self) -> &str {
        self.profile_image
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_PROFILE_IMAGE)
    }
}

/// 出行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TravelMode {
    pub const ALL: [TravelMode; 4] = [
        TravelMode::Driving,
        TravelMode::Walking,
        TravelMode::Bicycling,
        TravelMode::Transit,
    ];

    /// 地图服务商使用的出行方式代码
    pub fn provider_code(&self) -> &'static str {
        match self {
            TravelMode::Driving => "DRIVING",
            TravelMode::Walking => "WALKING",
            TravelMode::Bicycling => "BICYCLING",
            TravelMode::Transit => "TRANSIT",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TravelMode::Driving => "Car",
            TravelMode::Walking => "Walking",
            TravelMode::Bicycling => "Bicycle",
            TravelMode::Transit => "Public transit",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            TravelMode::Driving => "🚗",
            TravelMode::Walking => "🚶",
            TravelMode::Bicycling => "🚲",
            TravelMode::Transit => "🚌",
        }
    }
}
