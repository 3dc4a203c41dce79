//! エラー型定義

use thiserror::Error;

use crate::validation::ValidationError;

/// 解析サービス呼び出しの失敗
///
/// HTTPステータス（到達不能なら0）と、ユーザー向けメッセージを保持する。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", self.message.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE))]
pub struct ServiceFailure {
    pub status: Option<u16>,
    pub message: Option<String>,
}

/// サービスがメッセージを返さなかった場合の表示文言
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred during analysis.";

impl ServiceFailure {
    pub fn new(status: Option<u16>, message: Option<String>) -> Self {
        Self { status, message }
    }

    /// HTTPステータスからユーザー向けメッセージを決定
    ///
    /// 既知のステータスは固定メッセージに変換し、それ以外は
    /// サーバーが返した `error` フィールドをそのまま使う。
    pub fn from_status(status: u16, server_message: Option<String>) -> Self {
        let mapped = match status {
            0 => Some("Connection failed. Please check that the analysis service is running."),
            400 => Some("Invalid file or request."),
            413 => Some("File too large."),
            415 => Some("Unsupported file format."),
            500 => Some("Server error. Please try again later."),
            504 => Some("The request timed out. Please try again."),
            _ => None,
        };
        let message = mapped
            .map(str::to_string)
            .or_else(|| server_message.filter(|m| !m.trim().is_empty()));
        Self::new(Some(status), message)
    }

    /// 接続失敗（ステータス0）
    pub fn unreachable() -> Self {
        Self::from_status(0, None)
    }

    /// クライアント側タイムアウト（504と同じ扱い）
    pub fn timed_out() -> Self {
        Self::from_status(504, None)
    }

    /// 再試行に値する一時的な失敗か
    pub fn is_transient(&self) -> bool {
        matches!(self.status, Some(0) | Some(500..=599))
    }

    /// 表示用メッセージ（なければ汎用文言）
    pub fn user_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
    }
}

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceFailure),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
