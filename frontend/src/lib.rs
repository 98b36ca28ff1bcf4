//! StarMap 前端应用
//!
//! 分层结构：
//! - `gateway`: 后端 REST 网关
//! - `maps`: 地图能力 trait 与 Google Maps 绑定
//! - `places` / `markers` / `route`: 地点存储、标记层、路线状态机
//! - `session`: 持有以上全部状态的 `MapSession`
//! - `components`: UI 组件层

// 日志宏：wasm32 下输出到浏览器控制台，原生测试中输出到 stdout / stderr
macro_rules! log_info {
    ($($t:tt)*) => { leptos::logging::log!($($t)*) };
}
macro_rules! log_warn {
    ($($t:tt)*) => { leptos::logging::warn!($($t)*) };
}
macro_rules! log_error {
    ($($t:tt)*) => { leptos::logging::error!($($t)*) };
}

mod components {
    pub mod header;
    pub mod map_view;
    pub mod place_list;
}
mod config;
mod context;
mod error;
mod gateway;
mod location;
mod maps;
mod markers;
mod places;
mod route;
mod serde_helper;
mod session;

// 浏览器 API 封装
pub(crate) mod web {
    pub mod dialog;
    pub mod geolocation;
    mod timer;

    pub use timer::BrowserScheduler;
}

use crate::components::header::Header;
use crate::components::map_view::MapView;
use crate::components::place_list::PlaceList;
use crate::config::AppConfig;
use crate::context::AppContext;

use leptos::prelude::*;

#[component]
pub fn App() -> impl IntoView {
    // 1. 配置：编译期默认值 + LocalStorage 覆盖
    let ctx = AppContext::new(AppConfig::load());
    provide_context(ctx);

    // 2. 地图挂载后由 MapView 创建会话并加载数据
    view! {
        <div class="flex flex-col h-screen bg-base-200">
            <Header />
            <div class="flex flex-1 min-h-0">
                <aside class="w-80 bg-base-100 shadow-lg overflow-hidden">
                    <PlaceList />
                </aside>
                <main class="flex-1 min-w-0">
                    <MapView />
                </main>
            </div>
        </div>
    }
}
