//! 应用上下文
//!
//! 组件之间共享的响应式状态，以及地图挂载后创建的 `MapSession`。

use crate::config::AppConfig;
use crate::gateway::BrowserHttpClient;
use crate::maps::google::GoogleMap;
use crate::session::MapSession;
use crate::web::BrowserScheduler;
use leptos::prelude::*;
use starmap_shared::{Place, UserInfo};

pub type BrowserSession = MapSession<BrowserHttpClient, GoogleMap, BrowserScheduler>;

#[derive(Clone, Copy)]
pub struct AppContext {
    pub config: StoredValue<AppConfig>,
    /// 登录用户（`/userinfo` 成功时存在）
    pub user: RwSignal<Option<UserInfo>>,
    /// `/userinfo` 是否已经返回（避免登录按钮闪烁）
    pub session_checked: RwSignal<bool>,
    /// 地点列表快照，由会话在每次变化后推送
    pub places: RwSignal<Vec<Place>>,
    session: StoredValue<Option<BrowserSession>, LocalStorage>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: StoredValue::new(config),
            user: RwSignal::new(None),
            session_checked: RwSignal::new(false),
            places: RwSignal::new(Vec::new()),
            session: StoredValue::new_local(None),
        }
    }

    /// 地图尚未挂载时为 None
    pub fn session(&self) -> Option<BrowserSession> {
        self.session.get_value()
    }

    pub fn attach(&self, session: BrowserSession) {
        self.session.set_value(Some(session));
    }

    pub fn detach(&self) -> Option<BrowserSession> {
        let mut taken = None;
        self.session.update_value(|slot| taken = slot.take());
        taken
    }
}

pub fn use_app() -> AppContext {
    expect_context::<AppContext>()
}
