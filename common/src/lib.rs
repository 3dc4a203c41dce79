//! Resume ATS Common Library
//!
//! ブラウザ(WASM)とCLIで共有するセッション層:
//! 解析ワークフロー、通知キュー、解析履歴、チャット

pub mod chat;
pub mod error;
pub mod history;
pub mod notification;
pub mod observe;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod storage;
pub mod types;
pub mod validation;
pub mod workflow;

#[cfg(test)]
pub(crate) mod fake;

pub use chat::{ChatMessage, ChatRole, ChatSession};
pub use error::{Error, Result, ServiceFailure};
pub use history::{HistoryEntry, HistoryStore, MAX_HISTORY};
pub use notification::{Notification, NotificationCenter, NotificationId, Severity, MAX_VISIBLE};
pub use scheduler::{ManualScheduler, Scheduler, TimerHandle};
pub use service::{with_retry, AnalysisRequest, AtsService, ChatContext, REQUEST_TIMEOUT};
pub use session::Session;
pub use storage::{KeyValueStore, MemoryStore};
pub use types::{AnalysisPayload, Rating, TimelineItem};
pub use validation::{JobDescription, UploadFile, ValidationError};
pub use workflow::{AnalysisWorkflow, SessionState, SubmitOutcome, WorkflowStep};
