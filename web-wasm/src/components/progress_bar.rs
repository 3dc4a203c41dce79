//! 進捗表示コンポーネント

use leptos::prelude::*;

use crate::app::AppContext;

#[component]
pub fn ProgressBar(app: AppContext) -> impl IntoView {
    view! {
        <div class="progress-container">
            <div class="spinner" />
            <p class="progress-text">
                {move || app.state.with(|s| s.caption.clone().unwrap_or_default())}
            </p>
            <p class="text-muted">{move || app.state.with(|s| s.step.as_str())}</p>
        </div>
    }
}
