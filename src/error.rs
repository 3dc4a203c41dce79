use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtsCliError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("履歴が見つかりません: {0}")]
    HistoryNotFound(String),

    #[error("解析結果がありません。先に `resume-ats analyze` を実行してください")]
    NoResult,

    #[error("HTTPクライアントエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ログ初期化エラー: {0}")]
    Logging(String),

    #[error("入力エラー: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] resume_ats_common::Error),
}

pub type Result<T> = std::result::Result<T, AtsCliError>;
