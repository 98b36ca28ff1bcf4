//! 标记层
//!
//! 每个身份键最多一个存活标记，与 `PlaceStore` 中的条目一一对应。

use crate::maps::{MapCanvas, MarkerSpec};
use starmap_shared::{Bounds, LatLng, Place, PlaceKey};
use std::collections::HashMap;

pub struct MarkerLayer<M> {
    markers: HashMap<PlaceKey, (LatLng, M)>,
}

impl<M> Default for MarkerLayer<M> {
    fn default() -> Self {
        Self {
            markers: HashMap::new(),
        }
    }
}

impl<M> MarkerLayer<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// 为新键创建标记；键已存在时什么也不做（不会移动已有标记）
    ///
    /// 返回是否新建了标记。
    pub fn upsert<C>(&mut self, map: &C, place: &Place) -> bool
    where
        C: MapCanvas<Marker = M>,
    {
        let key = place.key();
        if self.markers.contains_key(&key) {
            return false;
        }

        let spec = MarkerSpec {
            key: key.clone(),
            position: place.position(),
            title: place.name.clone(),
            address: place.address.clone(),
        };
        let marker = match map.create_marker(&spec) {
            Ok(marker) => marker,
            Err(e) => {
                log_warn!("[Markers] Advanced marker failed for {}: {}", key, e);
                map.create_legacy_marker(&spec)
            }
        };

        self.markers.insert(key, (spec.position, marker));
        true
    }

    /// 移除指定坐标上的标记并关闭信息窗
    pub fn remove_by_coordinate<C>(&mut self, map: &C, lat: f64, lng: f64) -> bool
    where
        C: MapCanvas<Marker = M>,
    {
        let removed = self.markers.remove(&PlaceKey::new(lat, lng));
        if let Some((_, marker)) = &removed {
            map.remove_marker(marker);
        }
        map.close_info();
        removed.is_some()
    }

    pub fn clear_all<C>(&mut self, map: &C)
    where
        C: MapCanvas<Marker = M>,
    {
        for (_, (_, marker)) in self.markers.drain() {
            map.remove_marker(&marker);
        }
        map.close_info();
    }

    /// 调整视口覆盖所有标记
    ///
    /// - 0 个：不动
    /// - 1 个：以该点为中心、固定缩放级别
    /// - 多个：fit bounds
    pub fn fit_all_in_view<C: MapCanvas>(&self, map: &C, focus_zoom: u8) {
        let positions = self.markers.values().map(|(position, _)| *position);
        let Some(bounds) = Bounds::around(positions) else {
            return;
        };
        if self.markers.len() == 1 {
            map.focus(bounds.center(), focus_zoom);
        } else {
            map.fit_bounds(&bounds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::mock::{MockMap, Viewport};
    use starmap_shared::PlaceId;

    fn place(id: i64, lat: f64, lng: f64) -> Place {
        Place {
            id: PlaceId(id),
            name: format!("Place {id}"),
            address: "Seoul".to_string(),
            latitude: lat,
            longitude: lng,
            external_place_id: None,
        }
    }

    #[test]
    fn test_upsert_is_idempotent_per_key() {
        let map = MockMap::new();
        let mut layer = MarkerLayer::new();

        assert!(layer.upsert(&map, &place(1, 37.5, 127.0)));
        assert!(!layer.upsert(&map, &place(2, 37.5, 127.0)));

        assert_eq!(layer.len(), 1);
        assert_eq!(map.markers.borrow().len(), 1);
    }

    #[test]
    fn test_upsert_falls_back_to_legacy_marker() {
        let map = MockMap::new();
        map.fail_advanced_markers();
        let mut layer = MarkerLayer::new();

        assert!(layer.upsert(&map, &place(1, 37.5, 127.0)));

        let markers = map.markers.borrow();
        assert_eq!(markers.len(), 1);
        assert!(markers.values().all(|m| m.legacy));
    }

    #[test]
    fn test_remove_by_coordinate_detaches_and_closes_info() {
        let map = MockMap::new();
        let mut layer = MarkerLayer::new();
        layer.upsert(&map, &place(1, 37.5, 127.0));
        layer.upsert(&map, &place(2, 37.6, 127.1));
        map.show_info(LatLng::new(37.5, 127.0), &crate::maps::InfoContent::notice("a", "b"));

        assert!(layer.remove_by_coordinate(&map, 37.5, 127.0));

        assert_eq!(layer.len(), 1);
        assert_eq!(map.marker_keys(), vec![PlaceKey::new(37.6, 127.1)]);
        assert!(map.info.borrow().is_none());
    }

    #[test]
    fn test_clear_all_detaches_everything() {
        let map = MockMap::new();
        let mut layer = MarkerLayer::new();
        layer.upsert(&map, &place(1, 37.5, 127.0));
        layer.upsert(&map, &place(2, 37.6, 127.1));

        layer.clear_all(&map);

        assert!(layer.is_empty());
        assert!(map.markers.borrow().is_empty());
    }

    #[test]
    fn test_fit_single_marker_uses_fixed_zoom() {
        let map = MockMap::new();
        let mut layer = MarkerLayer::new();
        layer.upsert(&map, &place(1, 37.5, 127.0));

        layer.fit_all_in_view(&map, 15);

        assert_eq!(
            *map.viewport.borrow(),
            Some(Viewport::Focus(LatLng::new(37.5, 127.0), 15))
        );
    }

    #[test]
    fn test_fit_many_markers_uses_bounds() {
        let map = MockMap::new();
        let mut layer = MarkerLayer::new();
        layer.upsert(&map, &place(1, 37.5, 127.0));
        layer.upsert(&map, &place(2, 37.6, 126.9));

        layer.fit_all_in_view(&map, 15);

        let viewport = map.viewport.borrow().clone();
        match viewport {
            Some(Viewport::Fit(bounds)) => {
                assert_eq!(bounds.south, 37.5);
                assert_eq!(bounds.north, 37.6);
                assert_eq!(bounds.west, 126.9);
                assert_eq!(bounds.east, 127.0);
            }
            other => panic!("expected bounds fit, got {:?}", other),
        }
    }

    #[test]
    fn test_fit_without_markers_is_noop() {
        let map = MockMap::new();
        let layer: MarkerLayer<crate::maps::mock::MockMarker> = MarkerLayer::new();

        layer.fit_all_in_view(&map, 15);

        assert!(map.viewport.borrow().is_none());
    }
}
