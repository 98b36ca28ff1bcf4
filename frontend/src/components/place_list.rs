use crate::context::{AppContext, use_app};
use leptos::prelude::*;
use leptos::task::spawn_local;
use starmap_shared::{Place, TravelMode};

/// 收藏地点列表，按身份键渲染，重复键不会产生重复行
#[component]
pub fn PlaceList() -> impl IntoView {
    let ctx = use_app();
    let is_empty = move || ctx.places.with(|p| p.is_empty());

    view! {
        <div class="flex flex-col h-full">
            <h2 class="text-lg font-semibold p-4 pb-2">"Starred places"</h2>
            <Show when=is_empty>
                <p class="px-4 text-sm text-base-content/60">
                    "Click the map to star a place."
                </p>
            </Show>
            <ul class="menu w-full overflow-y-auto flex-1">
                <For each=move || ctx.places.get() key=|place| place.key() let:place>
                    <PlaceRow place=place />
                </For>
            </ul>
        </div>
    }
}

#[component]
fn PlaceRow(place: Place) -> impl IntoView {
    let ctx = use_app();
    let key = place.key();
    let id = place.id;

    let on_select = move |_| {
        let Some(session) = ctx.session() else {
            return;
        };
        let key = key.clone();
        spawn_local(async move {
            if let Err(e) = session.select_place(&key).await {
                log_warn!("[List] {}", e);
            }
        });
    };

    let on_delete = move |ev: leptos::ev::MouseEvent| {
        ev.stop_propagation();
        let Some(session) = ctx.session() else {
            return;
        };
        spawn_local(async move {
            if let Err(e) = session.remove_place(id).await {
                log_warn!("[List] {}", e);
            }
        });
    };

    let mode_buttons = TravelMode::ALL
        .into_iter()
        .map(move |mode| {
            view! {
                <button
                    class="btn btn-ghost btn-xs"
                    title=mode.display_name()
                    on:click=move |ev: leptos::ev::MouseEvent| {
                        ev.stop_propagation();
                        change_mode(ctx, mode);
                    }
                >
                    {mode.icon()}
                </button>
            }
        })
        .collect_view();

    view! {
        <li>
            <div class="flex items-center gap-2" on:click=on_select>
                <span class="flex-1 truncate">{place.name}</span>
                <span class="flex gap-0.5">{mode_buttons}</span>
                <button class="btn btn-ghost btn-xs text-error" title="Remove" on:click=on_delete>
                    "✕"
                </button>
            </div>
        </li>
    }
}

fn change_mode(ctx: AppContext, mode: TravelMode) {
    let Some(session) = ctx.session() else {
        return;
    };
    spawn_local(async move {
        if let Err(e) = session.change_travel_mode(mode).await {
            log_warn!("[List] {}", e);
        }
    });
}
