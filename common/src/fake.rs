//! テスト用の解析サービスとストア

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use async_trait::async_trait;
use futures::channel::oneshot;
use serde_json::{json, Value};

use crate::error::{Error, Result, ServiceFailure};
use crate::service::{AnalysisRequest, AtsPdfRequest, AtsService, ChatContext, CoverLetterRequest};
use crate::storage::KeyValueStore;
use crate::types::AnalysisPayload;

pub fn payload_with_score(score: f64) -> AnalysisPayload {
    AnalysisPayload::new(json!({
        "success": true,
        "results": {
            "overall_score": score,
            "candidate_name": "Jane Doe",
            "keyword_match": { "missing_keywords": ["docker", "graphql"] },
            "skills": { "technical": 12, "soft": 4 }
        }
    }))
}

/// 応答をキューで差し込めるサービス
///
/// キューが空なら成功（スコア72）を返す。
#[derive(Default)]
pub struct FakeService {
    analysis_responses: RefCell<VecDeque<std::result::Result<AnalysisPayload, ServiceFailure>>>,
    analysis_gate: RefCell<Option<oneshot::Receiver<()>>>,
    chat_responses: RefCell<VecDeque<std::result::Result<String, ServiceFailure>>>,
    chat_gate: RefCell<Option<oneshot::Receiver<()>>>,
    pub analyze_calls: Cell<usize>,
    pub last_request: RefCell<Option<AnalysisRequest>>,
    pub chat_calls: RefCell<Vec<(String, ChatContext)>>,
    pub last_letter_request: RefCell<Option<CoverLetterRequest>>,
}

impl FakeService {
    pub fn push_analysis(&self, response: std::result::Result<AnalysisPayload, ServiceFailure>) {
        self.analysis_responses.borrow_mut().push_back(response);
    }

    /// 次の解析リクエストを `gate` が解放されるまで止める
    pub fn hold_next_analysis(&self, gate: oneshot::Receiver<()>) {
        self.analysis_gate.replace(Some(gate));
    }

    pub fn push_chat(&self, response: std::result::Result<String, ServiceFailure>) {
        self.chat_responses.borrow_mut().push_back(response);
    }

    pub fn hold_next_chat(&self, gate: oneshot::Receiver<()>) {
        self.chat_gate.replace(Some(gate));
    }
}

#[async_trait(?Send)]
impl AtsService for FakeService {
    async fn analyze_resume(
        &self,
        request: &AnalysisRequest,
    ) -> std::result::Result<AnalysisPayload, ServiceFailure> {
        self.analyze_calls.set(self.analyze_calls.get() + 1);
        self.last_request.replace(Some(request.clone()));
        let gate = self.analysis_gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.analysis_responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(payload_with_score(72.0)))
    }

    async fn chat(
        &self,
        message: &str,
        context: &ChatContext,
    ) -> std::result::Result<String, ServiceFailure> {
        self.chat_calls
            .borrow_mut()
            .push((message.to_string(), context.clone()));
        let gate = self.chat_gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.chat_responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("echo: {}", message)))
    }

    async fn generate_cover_letter(
        &self,
        request: &CoverLetterRequest,
    ) -> std::result::Result<String, ServiceFailure> {
        self.last_letter_request.replace(Some(request.clone()));
        Ok(format!("Dear Hiring Manager, I am {}.", request.name))
    }

    async fn generate_ats_pdf(
        &self,
        request: &AtsPdfRequest,
    ) -> std::result::Result<String, ServiceFailure> {
        Ok(format!("ATS_Friendly_{}.txt", request.name))
    }

    async fn analyze_linkedin(&self, _text: &str) -> std::result::Result<Value, ServiceFailure> {
        Ok(json!({"score": 50}))
    }

    fn download_url(&self, filename: &str) -> String {
        format!("http://localhost:5000/download/{}", filename)
    }
}

/// 書き込みが常に失敗するストア
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Error::Storage("quota exceeded".into()))
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Err(Error::Storage("quota exceeded".into()))
    }
}
