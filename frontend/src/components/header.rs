use crate::context::use_app;
use crate::web::dialog::navigate_to;
use leptos::prelude::*;
use starmap_shared::{LOGIN_PATH, LOGOUT_PATH};

#[component]
pub fn Header() -> impl IntoView {
    let ctx = use_app();

    let account = move || match ctx.user.get() {
        Some(user) => {
            let avatar = user.avatar_url().to_string();
            let name = user.name;
            view! {
                <div class="flex items-center gap-3">
                    <img class="w-8 h-8 rounded-full" src=avatar alt="profile" />
                    <span class="font-medium">{name}</span>
                    <button
                        class="btn btn-outline btn-sm"
                        on:click=move |_| navigate_to(LOGOUT_PATH)
                    >
                        "Logout"
                    </button>
                </div>
            }
            .into_any()
        }
        None => view! {
            <Show when=move || ctx.session_checked.get()>
                <button class="btn btn-primary btn-sm" on:click=move |_| navigate_to(LOGIN_PATH)>
                    "Login with Google"
                </button>
            </Show>
        }
        .into_any(),
    };

    view! {
        <div class="navbar bg-base-100 shadow z-10">
            <div class="flex-1">
                <span class="text-xl font-bold px-2">"⭐ StarMap"</span>
            </div>
            <div class="flex-none">{account}</div>
        </div>
    }
}
