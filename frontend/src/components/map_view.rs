//! 地图视图
//!
//! 挂载后创建 Google 地图和 `MapSession`，然后依次：开始连续定位、
//! 获取登录用户、加载地点。卸载时释放定位句柄并清理地图。

use crate::context::{AppContext, BrowserSession, use_app};
use crate::gateway::{BackendGateway, BrowserHttpClient};
use crate::location::TrackerOptions;
use crate::maps::google::GoogleMap;
use crate::session::MapSession;
use crate::web::BrowserScheduler;
use crate::web::geolocation::{self, WatchHandle};
use futures::StreamExt;
use leptos::html::Div;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::rc::Rc;

#[component]
pub fn MapView() -> impl IntoView {
    let ctx = use_app();
    let map_ref = NodeRef::<Div>::new();
    let watch: StoredValue<Option<WatchHandle>, LocalStorage> = StoredValue::new_local(None);
    let map_error = RwSignal::new(None::<String>);

    Effect::new(move |_| {
        let Some(element) = map_ref.get() else {
            return;
        };
        if ctx.session().is_some() {
            return;
        }

        let config = ctx.config.get_value();
        let map = match GoogleMap::new(&element, &config) {
            Ok(map) => Rc::new(map),
            Err(e) => {
                log_error!("[Map] {}", e);
                map_error.set(Some(e.message));
                return;
            }
        };

        let gateway = BackendGateway::new(BrowserHttpClient, &config.api_base);
        let session = MapSession::new(config.clone(), gateway, map.clone(), BrowserScheduler);
        session.on_places_changed(move |places| ctx.places.set(places));
        {
            // 地图持有回调，回调只能弱引用会话
            let weak = session.downgrade();
            map.on_click(move |at| {
                let Some(session) = weak.upgrade() else {
                    return;
                };
                spawn_local(async move {
                    if let Err(e) = session.handle_map_click(at).await {
                        log_warn!("[Map] {}", e);
                    }
                });
            });
        }
        ctx.attach(session.clone());

        start_tracking(session.clone(), TrackerOptions::with_timeout(config.geolocation_timeout), watch);
        spawn_local(bootstrap(ctx, session));
    });

    on_cleanup(move || {
        watch.set_value(None);
        if let Some(session) = ctx.detach() {
            session.teardown();
        }
    });

    let locate_me = move |_| {
        let Some(session) = ctx.session() else {
            return;
        };
        let options = TrackerOptions::with_timeout(session.config().geolocation_timeout);
        spawn_local(async move {
            match geolocation::get_once(&options).await {
                Ok(position) => session.recenter(position),
                Err(e) => session.report_geolocation_error(e),
            }
        });
    };

    view! {
        <div class="relative w-full h-full">
            <div node_ref=map_ref class="w-full h-full"></div>
            <button
                class="btn btn-circle btn-sm absolute bottom-6 right-3 shadow"
                title="My location"
                on:click=locate_me
            >
                "◎"
            </button>
            <Show when=move || map_error.get().is_some()>
                <div class="absolute inset-0 flex items-center justify-center bg-base-200">
                    <div class="alert alert-error max-w-md">
                        <span>{move || map_error.get().unwrap_or_default()}</span>
                    </div>
                </div>
            </Show>
        </div>
    }
}

/// 登录用户 -> 地点
async fn bootstrap(ctx: AppContext, session: BrowserSession) {
    let user = session.fetch_session().await.ok();
    let signed_in = user.is_some();
    ctx.user.set(user);
    ctx.session_checked.set(true);

    if signed_in {
        // 失败已在会话内提示
        let _ = session.load_places().await;
    }
}

/// 开始连续定位；同一错误连续出现只提示一次
fn start_tracking(
    session: BrowserSession,
    options: TrackerOptions,
    watch: StoredValue<Option<WatchHandle>, LocalStorage>,
) {
    let (handle, mut events) = match geolocation::watch_stream(&options) {
        Ok(started) => started,
        Err(e) => {
            session.report_geolocation_error(e);
            return;
        }
    };
    watch.set_value(Some(handle));

    spawn_local(async move {
        let mut last_error = None;
        while let Some(event) = events.next().await {
            match event {
                Ok(position) => {
                    last_error = None;
                    session.update_position(position);
                }
                Err(e) if last_error != Some(e) => {
                    last_error = Some(e);
                    session.report_geolocation_error(e);
                }
                Err(_) => {}
            }
        }
        log_info!("[Geolocation] Stream closed");
    });
}
