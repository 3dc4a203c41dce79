//! ヘッダーコンポーネント

use leptos::prelude::*;

#[component]
pub fn Header() -> impl IntoView {
    view! {
        <header class="header">
            <h1>"Resume ATS Analyzer"</h1>
            <p class="text-muted">"Score your resume against applicant tracking systems"</p>
        </header>
    }
}
