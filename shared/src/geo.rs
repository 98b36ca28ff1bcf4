//! 坐标与几何模块
//!
//! 提供两种类型：
//! - `LatLng`: 经纬度坐标，负责归一化与合法性校验
//! - `Bounds`: 覆盖一组坐标的矩形区域，用于视口调整

use serde::{Deserialize, Serialize};
use std::fmt;

/// 地球半径（米），与地图服务商的球面距离计算保持一致
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

// =========================================================
// 坐标错误
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateError {
    /// NaN 或无穷大
    NotFinite,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateError::NotFinite => write!(f, "coordinate is not a finite number"),
            CoordinateError::LatitudeOutOfRange(v) => {
                write!(f, "latitude {} is outside [-90, 90]", v)
            }
            CoordinateError::LongitudeOutOfRange(v) => {
                write!(f, "longitude {} is outside [-180, 180]", v)
            }
        }
    }
}

impl std::error::Error for CoordinateError {}

// =========================================================
// LatLng
// =========================================================

/// 经纬度坐标
///
/// 序列化字段名为 `lat` / `lng`，可直接作为地图 SDK 的坐标字面量使用。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[inline]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// 归一化并校验坐标
    ///
    /// - 拒绝 NaN / 无穷大
    /// - `-0.0` 归一化为 `0.0`，保证身份键稳定
    /// - 纬度必须在 [-90, 90]，经度必须在 [-180, 180]
    pub fn normalized(self) -> Result<Self, CoordinateError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(CoordinateError::LatitudeOutOfRange(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(CoordinateError::LongitudeOutOfRange(self.lng));
        }
        Ok(Self {
            lat: self.lat + 0.0,
            lng: self.lng + 0.0,
        })
    }

    /// 球面（haversine）距离，单位米
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lng - self.lng).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

// =========================================================
// Bounds
// =========================================================

/// 覆盖一组坐标的矩形区域（不处理跨越反子午线的情况）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// 仅包含单个点的区域
    pub fn from_point(point: LatLng) -> Self {
        Self {
            south: point.lat,
            west: point.lng,
            north: point.lat,
            east: point.lng,
        }
    }

    /// 计算覆盖所有点的最小区域，空集合返回 `None`
    pub fn around<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::from_point(first), |mut bounds, p| {
            bounds.extend(p);
            bounds
        }))
    }

    pub fn extend(&mut self, point: LatLng) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
        self.west = self.west.min(point.lng);
        self.east = self.east.max(point.lng);
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }
}
