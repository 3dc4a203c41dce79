//! 解析履歴パネル

use leptos::prelude::*;

use crate::app::AppContext;

#[component]
pub fn HistoryPanel(app: AppContext) -> impl IntoView {
    let selected = move || app.state.with(|s| s.history_id.clone());

    view! {
        <section class="history">
            <div class="history-header">
                <h3>"Recent Analyses"</h3>
                <Show when=move || app.history.with(|h| !h.is_empty())>
                    <button
                        class="btn btn-link"
                        on:click=move |_| {
                            if let Err(e) = app.with(|s| s.history.clear()) {
                                log::warn!("failed to clear history: {}", e);
                            }
                        }
                    >
                        "Clear"
                    </button>
                </Show>
            </div>

            <Show
                when=move || app.history.with(|h| !h.is_empty())
                fallback=|| view! { <p class="text-muted">"No analyses yet"</p> }
            >
                <ul class="history-list">
                    {move || {
                        app.history
                            .get()
                            .into_iter()
                            .map(|entry| {
                                let id = entry.id.clone();
                                let remove_id = entry.id.clone();
                                let is_selected = selected() == Some(entry.id.clone());
                                view! {
                                    <li class={if is_selected { "history-item selected" } else { "history-item" }}>
                                        <button
                                            class="history-open"
                                            on:click=move |_| {
                                                app.with(|s| s.workflow.select_from_history(&id));
                                            }
                                        >
                                            <span class="history-score">{format!("{:.0}", entry.score)}</span>
                                            <span class="history-name">{entry.candidate_name}</span>
                                            <span class="text-muted">{entry.file_name}</span>
                                        </button>
                                        <button
                                            class="history-remove"
                                            on:click=move |_| {
                                                if let Err(e) = app.with(|s| s.history.remove(&remove_id)) {
                                                    log::warn!("failed to remove history entry: {}", e);
                                                }
                                            }
                                        >
                                            "×"
                                        </button>
                                    </li>
                                }
                            })
                            .collect_view()
                    }}
                </ul>
            </Show>
        </section>
    }
}
