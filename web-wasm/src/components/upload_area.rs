//! アップロードエリアコンポーネント
//!
//! 履歴書は選択時に検証され、不正なファイルは保持されない。
//! 求人票はファイルかテキストのどちらか（後から入力した方を使う）。

use leptos::ev::Event;
use leptos::prelude::*;
use leptos::task::spawn_local;
use resume_ats_common::validation::{ACCEPTED_EXTENSIONS, MAX_FILE_SIZE};
use resume_ats_common::{JobDescription, UploadFile};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{DragEvent, File, HtmlInputElement};

use crate::app::AppContext;

#[derive(Clone, Copy)]
enum Slot {
    Resume,
    JobDescription,
}

#[component]
pub fn UploadArea(app: AppContext) -> impl IntoView {
    let (is_dragover, set_is_dragover) = signal(false);
    let (jd_text, set_jd_text) = signal(String::new());
    let accept = ACCEPTED_EXTENSIONS.join(",");

    let resume_name = move || {
        app.state
            .with(|s| s.resume.as_ref().map(|f| f.name.clone()))
    };
    let jd_file_name = move || {
        app.state.with(|s| match &s.job_description {
            Some(JobDescription::File(f)) => Some(f.name.clone()),
            _ => None,
        })
    };

    let on_drop = move |ev: DragEvent| {
        ev.prevent_default();
        set_is_dragover.set(false);
        if app.is_waiting() {
            return;
        }
        if let Some(file) = ev
            .data_transfer()
            .and_then(|dt| dt.files())
            .and_then(|files| files.get(0))
        {
            load_file(app, file, Slot::Resume);
        }
    };

    let on_dragover = move |ev: DragEvent| {
        ev.prevent_default();
        set_is_dragover.set(true);
    };

    let on_resume_change = move |ev: Event| {
        if let Some(file) = first_file(&ev) {
            load_file(app, file, Slot::Resume);
        }
    };

    let on_jd_change = move |ev: Event| {
        if let Some(file) = first_file(&ev) {
            set_jd_text.set(String::new());
            load_file(app, file, Slot::JobDescription);
        }
    };

    let on_jd_input = move |ev: Event| {
        let text = event_target_value(&ev);
        app.with(|s| s.workflow.set_job_description_text(&text));
        set_jd_text.set(text);
    };

    view! {
        <section class="upload-section">
            <label
                class=move || {
                    if is_dragover.get() { "upload-area dragover" } else { "upload-area" }
                }
                on:drop=on_drop
                on:dragover=on_dragover
                on:dragleave=move |_| set_is_dragover.set(false)
            >
                <input
                    type="file"
                    class="hidden"
                    accept=accept.clone()
                    on:change=on_resume_change
                    prop:disabled=move || app.is_waiting()
                />
                <div class="upload-icon">"📄"</div>
                {move || match resume_name() {
                    Some(name) => view! { <p class="file-name">{name}</p> }.into_any(),
                    None => view! {
                        <p>"Drop your resume here or click to browse"</p>
                    }.into_any(),
                }}
                <p class="text-muted">"PDF, DOCX or DOC, up to 10 MB"</p>
            </label>

            <div class="job-description">
                <h3>"Job Description (optional)"</h3>
                <textarea
                    rows="6"
                    placeholder="Paste the job description here"
                    prop:value=move || jd_text.get()
                    on:input=on_jd_input
                    prop:disabled=move || app.is_waiting()
                />
                <label class="jd-file">
                    <input type="file" accept=accept on:change=on_jd_change />
                    {move || jd_file_name().unwrap_or_else(|| "or attach a file".to_string())}
                </label>
            </div>

            {move || app.state.with(|s| s.error_message.clone()).map(|msg| view! {
                <p class="error-message">{msg}</p>
            })}

            <button
                class="btn btn-primary"
                on:click=move |_| app.submit()
                prop:disabled=move || app.is_waiting()
            >
                "Analyze Resume"
            </button>
        </section>
    }
}

fn first_file(ev: &Event) -> Option<File> {
    let input: HtmlInputElement = event_target(ev);
    input.files().and_then(|files| files.get(0))
}

/// ファイルを読み込んでセッションへ渡す
fn load_file(app: AppContext, file: File, slot: Slot) {
    spawn_local(async move {
        match read_upload(&file).await {
            Ok(upload) => app.with(|s| match slot {
                // 不正なファイルは select_resume が通知済み
                Slot::Resume => {
                    s.workflow.select_resume(upload).ok();
                }
                Slot::JobDescription => {
                    s.workflow
                        .set_job_description(Some(JobDescription::File(upload)));
                }
            }),
            Err(e) => {
                log::warn!("failed to read {}: {:?}", file.name(), e);
                app.with(|s| {
                    s.notifications
                        .error("File Read Failed", "The selected file could not be read.")
                });
            }
        }
    });
}

/// 上限を超えるファイルは中身を読まない（選択時の検証で弾かれる）
async fn read_upload(file: &File) -> Result<UploadFile, JsValue> {
    let size = file.size() as u64;
    if size > MAX_FILE_SIZE {
        return Ok(UploadFile::metadata_only(file.name(), file.type_(), size));
    }
    let buffer = JsFuture::from(file.array_buffer()).await?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    Ok(UploadFile::new(file.name(), file.type_(), bytes))
}
