//! アシスタントとのチャット

use leptos::prelude::*;
use resume_ats_common::ChatRole;

use crate::app::AppContext;

#[component]
pub fn ChatPanel(app: AppContext) -> impl IntoView {
    let (draft, set_draft) = signal(String::new());

    let send = move || {
        let message = draft.get_untracked();
        if message.trim().is_empty() || app.chat_pending.get_untracked() {
            return;
        }
        set_draft.set(String::new());
        app.send_chat(message);
    };

    view! {
        <section class="chat">
            <h3>"Resume Assistant"</h3>
            <div class="chat-transcript">
                {move || {
                    app.chat
                        .get()
                        .into_iter()
                        .map(|m| {
                            let class = match m.role {
                                ChatRole::User => "chat-message user",
                                ChatRole::Assistant => "chat-message assistant",
                            };
                            view! { <div class=class>{m.text}</div> }
                        })
                        .collect_view()
                }}
                <Show when=move || app.chat_pending.get()>
                    <div class="chat-message assistant typing">"…"</div>
                </Show>
            </div>
            <form
                class="chat-input"
                on:submit=move |ev| {
                    ev.prevent_default();
                    send();
                }
            >
                <input
                    type="text"
                    placeholder="Ask how to improve your score"
                    prop:value=move || draft.get()
                    on:input=move |ev| set_draft.set(event_target_value(&ev))
                />
                <button class="btn" type="submit" prop:disabled=move || app.chat_pending.get()>
                    "Send"
                </button>
            </form>
        </section>
    }
}
