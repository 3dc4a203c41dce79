//! 通知トースト

use leptos::prelude::*;

use crate::app::AppContext;

#[component]
pub fn ToastStack(app: AppContext) -> impl IntoView {
    view! {
        <div class="toast-stack">
            {move || {
                app.notifications
                    .get()
                    .into_iter()
                    .map(|n| {
                        let id = n.id;
                        view! {
                            <div class=format!("toast toast-{}", n.severity.as_str())>
                                <span class="toast-icon">{n.severity.icon()}</span>
                                <div class="toast-body">
                                    <strong>{n.title}</strong>
                                    <p>{n.description}</p>
                                </div>
                                <button
                                    class="toast-close"
                                    on:click=move |_| app.with(|s| s.notifications.dismiss(id))
                                >
                                    "×"
                                </button>
                            </div>
                        }
                    })
                    .collect_view()
            }}
        </div>
    }
}
