//! 解析結果パネル

use leptos::prelude::*;
use resume_ats_common::types::score_label;
use resume_ats_common::AnalysisPayload;

use crate::app::AppContext;

#[component]
pub fn ResultsPanel(app: AppContext) -> impl IntoView {
    let result = move || app.state.with(|s| s.result.clone());

    view! {
        <section class="results">
            {move || result().map(|r| view! { <ResultSummary app=app result=r /> })}

            <div class="cover-letter">
                <h3>"Cover Letter"</h3>
                <button
                    class="btn"
                    on:click=move |_| app.generate_cover_letter()
                    prop:disabled=move || app.state.with(|s| s.generating_letter)
                >
                    {move || {
                        if app.state.with(|s| s.generating_letter) {
                            "Generating…"
                        } else {
                            "Generate Cover Letter"
                        }
                    }}
                </button>
                {move || app.state.with(|s| s.cover_letter.clone()).map(|letter| view! {
                    <pre class="letter">{letter}</pre>
                })}
            </div>

            <button class="btn btn-secondary" on:click=move |_| { app.with(|s| s.workflow.reset()); }>
                "New Analysis"
            </button>
        </section>
    }
}

#[component]
fn ResultSummary(app: AppContext, result: AnalysisPayload) -> impl IntoView {
    let score = result.overall_score().unwrap_or(0.0);
    let rating = result.rating().zip(result.rating_label());
    let breakdown = result.score_breakdown();
    let timeline = result.timeline();
    let has_timeline = !timeline.is_empty();
    let reports: Vec<(String, String)> = result
        .report_files()
        .into_iter()
        .map(|(kind, file)| (kind, app.with(|s| s.service.download_url(&file))))
        .collect();

    view! {
        <div class="score-card">
            <div class="score-circle" style=format!("--score: {score:.0}")>
                <span class="score-value">{format!("{score:.0}")}</span>
                <span class="score-max">"/100"</span>
            </div>
            <div>
                <h2>{result.candidate_name()}</h2>
                {rating.map(|(r, label)| view! {
                    <span class=format!("badge {}", r.css_class())>{label}</span>
                })}
            </div>
        </div>

        <div class="breakdown">
            {breakdown
                .into_iter()
                .map(|(key, value)| view! {
                    <div class="breakdown-row">
                        <span class="breakdown-label">{score_label(&key)}</span>
                        <div class="bar">
                            <div class="bar-fill" style=format!("width: {:.0}%", value.clamp(0.0, 100.0)) />
                        </div>
                        <span class="breakdown-value">{format!("{value:.0}")}</span>
                    </div>
                })
                .collect_view()}
        </div>

        <ItemList title="Strengths" class="strengths" items=result.strengths() />
        <ItemList title="Missing Keywords" class="keywords" items=result.missing_keywords() />
        <ItemList title="Recommendations" class="recommendations" items=result.recommendations() />

        {has_timeline.then(|| view! { <h3>"Experience"</h3> })}
        <ul class="timeline">
            {timeline
                .into_iter()
                .map(|item| view! {
                    <li>
                        <strong>{item.title}</strong>
                        " · "
                        {item.organization}
                        <span class="text-muted">{item.period}</span>
                    </li>
                })
                .collect_view()}
        </ul>

        <div class="reports">
            {reports
                .into_iter()
                .map(|(kind, url)| view! {
                    <a class="btn btn-link" href=url target="_blank">{format!("Download {kind}")}</a>
                })
                .collect_view()}
        </div>
    }
}

#[component]
fn ItemList(title: &'static str, class: &'static str, items: Vec<String>) -> impl IntoView {
    if items.is_empty() {
        return None;
    }
    Some(view! {
        <div class=class>
            <h3>{title}</h3>
            <ul>
                {items.into_iter().map(|item| view! { <li>{item}</li> }).collect_view()}
            </ul>
        </div>
    })
}
