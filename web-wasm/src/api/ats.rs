//! 解析サービス連携（fetch）
//!
//! タイムアウトは `AbortController` で打ち切り、504として扱う。
//! 一時的な失敗は `with_retry` で1回だけ再試行する。

use async_trait::async_trait;
use futures::future::{select, Either};
use gloo::timers::future::TimeoutFuture;
use resume_ats_common::service::{
    parse_body, string_field, AtsPdfRequest, CoverLetterRequest, MAX_RETRIES,
};
use resume_ats_common::{
    with_retry, AnalysisPayload, AnalysisRequest, AtsService, ChatContext, JobDescription,
    ServiceFailure, UploadFile, REQUEST_TIMEOUT,
};
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AbortController, Blob, BlobPropertyBag, FormData, Headers, Request, RequestInit, RequestMode,
    Response,
};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

pub struct FetchAtsService {
    base_url: String,
    timeout_ms: u32,
    retries: u32,
}

impl FetchAtsService {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms: REQUEST_TIMEOUT.as_millis() as u32,
            retries: MAX_RETRIES,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ServiceFailure> {
        let body = serde_json::to_string(body).map_err(|_| ServiceFailure::new(None, None))?;
        let headers = Headers::new().map_err(js_failure)?;
        headers
            .set("Content-Type", "application/json")
            .map_err(js_failure)?;
        let opts = RequestInit::new();
        opts.set_headers(headers.as_ref());
        opts.set_body(&JsValue::from_str(&body));
        self.send(path, opts).await
    }

    async fn post_form(&self, request: &AnalysisRequest) -> Result<Value, ServiceFailure> {
        let form = analysis_form(request).map_err(js_failure)?;
        let opts = RequestInit::new();
        opts.set_body(form.as_ref());
        self.send("analyze", opts).await
    }

    /// fetchとタイマーを競わせ、時間切れならリクエストを中断する
    async fn send(&self, path: &str, opts: RequestInit) -> Result<Value, ServiceFailure> {
        let window = web_sys::window().ok_or_else(ServiceFailure::unreachable)?;
        let controller = AbortController::new().map_err(js_failure)?;
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_signal(Some(&controller.signal()));
        let request = Request::new_with_str_and_init(&self.url(path), &opts).map_err(js_failure)?;

        let fetch = Box::pin(JsFuture::from(window.fetch_with_request(&request)));
        let timeout = Box::pin(TimeoutFuture::new(self.timeout_ms));
        let response = match select(fetch, timeout).await {
            Either::Left((response, _)) => response.map_err(js_failure)?,
            Either::Right(_) => {
                controller.abort();
                return Err(ServiceFailure::timed_out());
            }
        };
        let response: Response = response.dyn_into().map_err(js_failure)?;
        let status = response.status();
        let text = JsFuture::from(response.text().map_err(js_failure)?)
            .await
            .map_err(js_failure)?
            .as_string()
            .unwrap_or_default();
        log::debug!("POST {} -> {}", path, status);
        parse_body(status, &text)
    }
}

#[async_trait(?Send)]
impl AtsService for FetchAtsService {
    async fn analyze_resume(&self, request: &AnalysisRequest) -> Result<AnalysisPayload, ServiceFailure> {
        let value = with_retry(self.retries, || self.post_form(request)).await?;
        Ok(AnalysisPayload::new(value))
    }

    async fn chat(&self, message: &str, context: &ChatContext) -> Result<String, ServiceFailure> {
        let body = json!({ "message": message, "context": context });
        let value = with_retry(self.retries, || self.post_json("chat", &body)).await?;
        string_field(&value, &["response", "reply", "message"])
    }

    async fn generate_cover_letter(&self, request: &CoverLetterRequest) -> Result<String, ServiceFailure> {
        let body = serde_json::to_value(request).map_err(|_| ServiceFailure::new(None, None))?;
        let value = with_retry(self.retries, || self.post_json("generate-cover-letter", &body)).await?;
        string_field(&value, &["cover_letter"])
    }

    async fn generate_ats_pdf(&self, request: &AtsPdfRequest) -> Result<String, ServiceFailure> {
        let body = serde_json::to_value(request).map_err(|_| ServiceFailure::new(None, None))?;
        let value = with_retry(self.retries, || self.post_json("generate-ats-pdf", &body)).await?;
        string_field(&value, &["filename"])
    }

    async fn analyze_linkedin(&self, text: &str) -> Result<Value, ServiceFailure> {
        let body = json!({ "text": text });
        with_retry(self.retries, || self.post_json("analyze-linkedin", &body)).await
    }

    fn download_url(&self, filename: &str) -> String {
        self.url(&format!("download/{}", filename))
    }
}

/// 履歴書と求人票（ファイルまたはテキスト）のフォーム
fn analysis_form(request: &AnalysisRequest) -> Result<FormData, JsValue> {
    let form = FormData::new()?;
    form.append_with_blob_and_filename("resume", &to_blob(&request.resume)?, &request.resume.name)?;
    match &request.job_description {
        Some(JobDescription::File(file)) => {
            form.append_with_blob_and_filename("job_description", &to_blob(file)?, &file.name)?;
        }
        Some(JobDescription::Text(text)) => {
            form.append_with_str("job_description_text", text)?;
        }
        None => {}
    }
    Ok(form)
}

fn to_blob(file: &UploadFile) -> Result<Blob, JsValue> {
    let bytes = js_sys::Uint8Array::from(&file.data[..]);
    let parts = js_sys::Array::of1(&bytes);
    let bag = BlobPropertyBag::new();
    bag.set_type(&file.mime_type);
    Blob::new_with_u8_array_sequence_and_options(&parts, &bag)
}

/// fetch自体の失敗（CORS・接続不可）はステータス0
fn js_failure(error: JsValue) -> ServiceFailure {
    log::debug!("fetch failed: {:?}", error);
    ServiceFailure::unreachable()
}
