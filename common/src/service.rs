//! 解析サービスとの境界
//!
//! 実際の通信（ブラウザの fetch、CLIの reqwest）はこのトレイトの実装側が持つ。
//! 実装は [`REQUEST_TIMEOUT`] のタイムアウトと [`with_retry`] による
//! 1回の再試行を適用してから失敗を返すこと。

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServiceFailure;
use crate::types::AnalysisPayload;
use crate::validation::{JobDescription, UploadFile};

/// 1リクエストあたりのタイムアウト
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// 失敗時の自動再試行回数
pub const MAX_RETRIES: u32 = 1;

/// 解析リクエスト
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub resume: UploadFile,
    pub job_description: Option<JobDescription>,
}

/// チャットに添える文脈
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub missing_keywords: Vec<String>,
}

impl ChatContext {
    pub fn from_result(result: Option<&AnalysisPayload>) -> Self {
        match result {
            Some(result) => Self {
                score: result.overall_score(),
                missing_keywords: result.missing_keywords(),
            },
            None => Self::default(),
        }
    }
}

/// カバーレター生成リクエスト
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverLetterRequest {
    pub name: String,
    pub skills: Value,
    pub job_description: String,
}

/// ATS向けPDF（テキスト）生成リクエスト
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtsPdfRequest {
    pub name: String,
    pub text: String,
}

/// 解析サービス
#[async_trait(?Send)]
pub trait AtsService {
    async fn analyze_resume(&self, request: &AnalysisRequest) -> Result<AnalysisPayload, ServiceFailure>;

    /// アシスタントの返答テキスト
    async fn chat(&self, message: &str, context: &ChatContext) -> Result<String, ServiceFailure>;

    async fn generate_cover_letter(&self, request: &CoverLetterRequest) -> Result<String, ServiceFailure>;

    /// 生成されたファイル名
    async fn generate_ats_pdf(&self, request: &AtsPdfRequest) -> Result<String, ServiceFailure>;

    async fn analyze_linkedin(&self, text: &str) -> Result<Value, ServiceFailure>;

    /// レポートのダウンロードURL
    fn download_url(&self, filename: &str) -> String;
}

/// 一時的な失敗（接続不可・5xx）のみ `retries` 回まで再試行する
pub async fn with_retry<T, F, Fut>(retries: u32, mut attempt: F) -> Result<T, ServiceFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceFailure>>,
{
    let mut remaining = retries;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(failure) if failure.is_transient() && remaining > 0 => {
                remaining -= 1;
                log::warn!("request failed ({}), retrying", failure.user_message());
            }
            Err(failure) => return Err(failure),
        }
    }
}

/// `{"error": "..."}` 形式のエラーボディからメッセージを取り出す
pub fn error_message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// ステータスとボディからレスポンスを解釈する
pub fn parse_body(status: u16, body: &str) -> Result<Value, ServiceFailure> {
    if !(200..300).contains(&status) {
        return Err(ServiceFailure::from_status(status, error_message_from_body(body)));
    }
    serde_json::from_str(body).map_err(|e| {
        log::warn!("response is not JSON: {}", e);
        ServiceFailure::new(Some(status), None)
    })
}

/// 最初に見つかった文字列フィールドを返す
pub fn string_field(value: &Value, keys: &[&str]) -> Result<String, ServiceFailure> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| {
            log::warn!("unexpected response: missing field {}", keys.join("/"));
            ServiceFailure::new(None, None)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_retry_once_on_transient_failure() {
        let calls = Cell::new(0);
        let result = block_on(with_retry(MAX_RETRIES, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n == 1 {
                    Err(ServiceFailure::timed_out())
                } else {
                    Ok(n)
                }
            }
        }));
        assert_eq!(result, Ok(2));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_gives_up_after_one_retry() {
        let calls = Cell::new(0);
        let result: Result<(), _> = block_on(with_retry(MAX_RETRIES, || {
            calls.set(calls.get() + 1);
            async { Err(ServiceFailure::unreachable()) }
        }));
        assert_eq!(result.unwrap_err().status, Some(0));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_client_error_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = block_on(with_retry(MAX_RETRIES, || {
            calls.set(calls.get() + 1);
            async { Err(ServiceFailure::from_status(413, None)) }
        }));
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_chat_context_from_result() {
        let payload = AnalysisPayload::new(json!({
            "results": {"overall_score": 61, "keyword_match": {"missing_keywords": ["sql"]}}
        }));
        let context = ChatContext::from_result(Some(&payload));
        assert_eq!(context.score, Some(61.0));
        assert_eq!(context.missing_keywords, vec!["sql"]);
        assert_eq!(ChatContext::from_result(None), ChatContext::default());
    }

    #[test]
    fn test_chat_context_serialization_omits_missing_score() {
        let json = serde_json::to_value(ChatContext::default()).unwrap();
        assert_eq!(json, json!({"missing_keywords": []}));
    }

    #[test]
    fn test_error_message_from_body() {
        assert_eq!(
            error_message_from_body(r#"{"error": "No resume file provided"}"#).as_deref(),
            Some("No resume file provided")
        );
        assert_eq!(error_message_from_body("<html>"), None);
    }
    #[test]
    fn test_parse_body_maps_known_status() {
        let failure = parse_body(413, r#"{"error": "too big"}"#).unwrap_err();
        assert_eq!(failure.status, Some(413));
        assert_eq!(failure.user_message(), "File too large.");
    }

    #[test]
    fn test_parse_body_uses_server_message_for_unmapped_status() {
        let failure = parse_body(404, r#"{"error": "File not found"}"#).unwrap_err();
        assert_eq!(failure.user_message(), "File not found");
    }

    #[test]
    fn test_parse_body_generic_message_without_body() {
        let failure = parse_body(418, "").unwrap_err();
        assert_eq!(failure.user_message(), "An error occurred during analysis.");
        assert_eq!(
            parse_body(200, "not json").unwrap_err().user_message(),
            "An error occurred during analysis."
        );
    }

    #[test]
    fn test_parse_body_success() {
        let value = parse_body(200, r#"{"results": {"overall_score": 80}}"#).unwrap();
        assert_eq!(value["results"]["overall_score"], 80);
    }

    #[test]
    fn test_string_field_fallbacks() {
        let value = json!({ "reply": "hello" });
        assert_eq!(
            string_field(&value, &["response", "reply", "message"]).unwrap(),
            "hello"
        );
        assert!(string_field(&value, &["cover_letter"]).is_err());
    }
}
