//! 地点存储
//!
//! 后端地点的去重内存副本。身份键为坐标字符串，重复坐标的记录只保留第一条。

use starmap_shared::{Place, PlaceId, PlaceKey};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct PlaceStore {
    places: Vec<Place>,
    keys: HashSet<PlaceKey>,
}

impl PlaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空后整体替换，返回去重后实际保留的地点
    pub fn replace_all(&mut self, incoming: Vec<Place>) -> Vec<Place> {
        self.places.clear();
        self.keys.clear();
        for place in incoming {
            self.insert(place);
        }
        self.places.clone()
    }

    /// 键已存在时忽略，返回是否插入
    pub fn insert(&mut self, place: Place) -> bool {
        if !self.keys.insert(place.key()) {
            return false;
        }
        self.places.push(place);
        true
    }

    pub fn remove_by_id(&mut self, id: PlaceId) -> Option<Place> {
        let index = self.places.iter().position(|p| p.id == id)?;
        let place = self.places.remove(index);
        self.keys.remove(&place.key());
        Some(place)
    }

    pub fn get(&self, key: &PlaceKey) -> Option<&Place> {
        if !self.keys.contains(key) {
            return None;
        }
        self.places.iter().find(|p| &p.key() == key)
    }

    pub fn find_by_id(&self, id: PlaceId) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }

    pub fn contains_key(&self, key: &PlaceKey) -> bool {
        self.keys.contains(key)
    }

    pub fn snapshot(&self) -> Vec<Place> {
        self.places.clone()
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}
