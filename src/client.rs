//! 解析サービスのHTTPクライアント
//!
//! 全リクエストにタイムアウトを掛け、一時的な失敗は
//! `with_retry` で1回だけ再試行する。

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use resume_ats_common::service::{parse_body, string_field, AtsPdfRequest, CoverLetterRequest};
use resume_ats_common::{
    with_retry, AnalysisPayload, AnalysisRequest, AtsService, ChatContext, JobDescription,
    ServiceFailure, UploadFile,
};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;

pub struct HttpAtsService {
    client: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl HttpAtsService {
    pub fn new(base_url: impl Into<String>, timeout: Duration, retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retries,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api_url(),
            Duration::from_secs(config.timeout_seconds),
            config.max_retries,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_form(&self, form: Form) -> std::result::Result<Value, ServiceFailure> {
        let response = self
            .client
            .post(self.url("analyze"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| failure_from_transport(&e))?;
        read_json(response).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> std::result::Result<Value, ServiceFailure> {
        log::debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| failure_from_transport(&e))?;
        read_json(response).await
    }
}

#[async_trait(?Send)]
impl AtsService for HttpAtsService {
    async fn analyze_resume(
        &self,
        request: &AnalysisRequest,
    ) -> std::result::Result<AnalysisPayload, ServiceFailure> {
        let value = with_retry(self.retries, move || async move {
            let form = analysis_form(request)?;
            self.post_form(form).await
        })
        .await?;
        Ok(AnalysisPayload::new(value))
    }

    async fn chat(
        &self,
        message: &str,
        context: &ChatContext,
    ) -> std::result::Result<String, ServiceFailure> {
        let body = json!({ "message": message, "context": context });
        let value = with_retry(self.retries, || self.post_json("chat", &body)).await?;
        string_field(&value, &["response", "reply", "message"])
    }

    async fn generate_cover_letter(
        &self,
        request: &CoverLetterRequest,
    ) -> std::result::Result<String, ServiceFailure> {
        let body = serde_json::to_value(request).map_err(|e| invalid_response(e.to_string()))?;
        let value = with_retry(self.retries, || self.post_json("generate-cover-letter", &body)).await?;
        string_field(&value, &["cover_letter"])
    }

    async fn generate_ats_pdf(
        &self,
        request: &AtsPdfRequest,
    ) -> std::result::Result<String, ServiceFailure> {
        let body = serde_json::to_value(request).map_err(|e| invalid_response(e.to_string()))?;
        let value = with_retry(self.retries, || self.post_json("generate-ats-pdf", &body)).await?;
        string_field(&value, &["filename"])
    }

    async fn analyze_linkedin(&self, text: &str) -> std::result::Result<Value, ServiceFailure> {
        let body = json!({ "text": text });
        with_retry(self.retries, || self.post_json("analyze-linkedin", &body)).await
    }

    fn download_url(&self, filename: &str) -> String {
        self.url(&format!("download/{}", filename))
    }
}

/// 解析リクエストのマルチパートフォーム
///
/// 求人票はファイルなら `job_description`、テキストなら
/// `job_description_text` として送る。
fn analysis_form(request: &AnalysisRequest) -> std::result::Result<Form, ServiceFailure> {
    let mut form = Form::new().part("resume", file_part(&request.resume)?);
    match &request.job_description {
        Some(JobDescription::File(file)) => {
            form = form.part("job_description", file_part(file)?);
        }
        Some(JobDescription::Text(text)) => {
            form = form.text("job_description_text", text.clone());
        }
        None => {}
    }
    Ok(form)
}

fn file_part(file: &UploadFile) -> std::result::Result<Part, ServiceFailure> {
    let part = Part::bytes(file.data.to_vec()).file_name(file.name.clone());
    if file.mime_type.is_empty() {
        return Ok(part);
    }
    part.mime_str(&file.mime_type)
        .map_err(|_| ServiceFailure::from_status(415, None))
}

/// 送信前後のトランスポートエラーを失敗に変換する
///
/// クライアント側タイムアウトは504、接続できなければ0として扱う。
pub fn failure_from_transport(error: &reqwest::Error) -> ServiceFailure {
    if error.is_timeout() {
        ServiceFailure::timed_out()
    } else if let Some(status) = error.status() {
        ServiceFailure::from_status(status.as_u16(), None)
    } else {
        log::debug!("transport error: {}", error);
        ServiceFailure::unreachable()
    }
}

async fn read_json(response: reqwest::Response) -> std::result::Result<Value, ServiceFailure> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| failure_from_transport(&e))?;
    parse_body(status, &body)
}

fn invalid_response(detail: String) -> ServiceFailure {
    log::warn!("unexpected response: {}", detail);
    ServiceFailure::new(None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url() {
        let service =
            HttpAtsService::new("http://localhost:5000/", Duration::from_secs(1), 1).unwrap();
        assert_eq!(
            service.download_url("report.pdf"),
            "http://localhost:5000/download/report.pdf"
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_maps_to_connection_failure() {
        // ポート1には誰も待ち受けていない
        let service = HttpAtsService::new("http://127.0.0.1:1", Duration::from_secs(2), 0).unwrap();
        let failure = service.analyze_linkedin("text").await.unwrap_err();
        assert_eq!(failure.status, Some(0));
        assert!(failure.user_message().starts_with("Connection failed"));
    }
}
