//! アシスタントとのチャット
//!
//! 送信のたびに現在の解析結果（総合スコア・不足キーワード）を文脈として添える。
//! 失敗は定型のお詫びメッセージとして会話に残し、通知は出さない。

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::observe::{emit, Observers, SubscriptionId};
use crate::service::{AtsService, ChatContext};
use crate::workflow::AnalysisWorkflow;

/// 最初に表示する挨拶
pub const CHAT_GREETING: &str =
    "Hi! I'm your resume assistant. Ask me anything about your analysis or how to improve your score.";

/// サービス失敗時の返答
pub const CHAT_APOLOGY: &str =
    "Sorry, I'm having trouble connecting right now. Please try again in a moment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

struct Inner {
    transcript: Vec<ChatMessage>,
    pending: bool,
    observers: Observers<[ChatMessage]>,
}

#[derive(Clone)]
pub struct ChatSession {
    inner: Rc<RefCell<Inner>>,
    service: Rc<dyn AtsService>,
    workflow: AnalysisWorkflow,
}

impl ChatSession {
    pub fn new(service: Rc<dyn AtsService>, workflow: AnalysisWorkflow) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                transcript: vec![ChatMessage::assistant(CHAT_GREETING)],
                pending: false,
                observers: Observers::default(),
            })),
            service,
            workflow,
        }
    }

    /// メッセージを送る
    ///
    /// 空白のみ、または前の返答待ちの間は何もせず `false` を返す。
    /// 受け付けた場合、会話は必ずアシスタントの返答（成功かお詫び）で終わる。
    pub async fn send(&self, message: &str) -> bool {
        let message = message.trim();
        if message.is_empty() {
            return false;
        }
        {
            let mut inner = self.inner.borrow_mut();
            if inner.pending {
                log::debug!("chat send ignored: reply pending");
                return false;
            }
            inner.pending = true;
        }
        self.push(ChatMessage::user(message));

        let context = ChatContext::from_result(self.workflow.current_result().as_ref());
        let reply = match self.service.chat(message, &context).await {
            Ok(reply) => reply,
            Err(failure) => {
                log::warn!("chat request failed: {}", failure.user_message());
                CHAT_APOLOGY.to_string()
            }
        };

        self.inner.borrow_mut().pending = false;
        self.push(ChatMessage::assistant(reply));
        true
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.inner.borrow().transcript.clone()
    }

    /// 返答待ちか（購読者への通知時点で更新済み）
    pub fn is_pending(&self) -> bool {
        self.inner.borrow().pending
    }

    pub fn subscribe(&self, callback: impl Fn(&[ChatMessage]) + 'static) -> SubscriptionId {
        self.inner.borrow_mut().observers.add(Rc::new(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().observers.remove(id)
    }

    fn push(&self, message: ChatMessage) {
        let (callbacks, snapshot) = {
            let mut inner = self.inner.borrow_mut();
            inner.transcript.push(message);
            (inner.observers.snapshot(), inner.transcript.clone())
        };
        emit(callbacks, snapshot.as_slice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceFailure;
    use crate::fake::FakeService;
    use crate::history::HistoryStore;
    use crate::notification::NotificationCenter;
    use crate::scheduler::{ManualScheduler, Scheduler};
    use crate::storage::MemoryStore;
    use crate::validation::UploadFile;
    use futures::channel::oneshot;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;

    fn setup() -> (Rc<FakeService>, AnalysisWorkflow, ChatSession) {
        let scheduler: Rc<dyn Scheduler> = Rc::new(ManualScheduler::new());
        let service = Rc::new(FakeService::default());
        let workflow = AnalysisWorkflow::new(
            service.clone(),
            NotificationCenter::new(scheduler.clone()),
            HistoryStore::load(Rc::new(MemoryStore::new())),
            scheduler,
        );
        let chat = ChatSession::new(service.clone(), workflow.clone());
        (service, workflow, chat)
    }

    #[test]
    fn test_seeded_with_greeting() {
        let (_, _, chat) = setup();
        assert_eq!(chat.transcript(), vec![ChatMessage::assistant(CHAT_GREETING)]);
    }

    #[test]
    fn test_blank_message_is_noop() {
        let (service, _, chat) = setup();
        assert!(!block_on(chat.send("   ")));
        assert_eq!(chat.transcript().len(), 1);
        assert!(service.chat_calls.borrow().is_empty());
    }

    #[test]
    fn test_reply_appended() {
        let (service, _, chat) = setup();
        service.push_chat(Ok("Add more metrics.".into()));

        assert!(block_on(chat.send("How do I improve?")));

        let transcript = chat.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1], ChatMessage::user("How do I improve?"));
        assert_eq!(transcript[2], ChatMessage::assistant("Add more metrics."));
    }

    #[test]
    fn test_failure_appends_apology_without_notification() {
        let (service, workflow, chat) = setup();
        service.push_chat(Err(ServiceFailure::unreachable()));

        block_on(chat.send("hello"));

        let last = chat.transcript().pop().unwrap();
        assert_eq!(last, ChatMessage::assistant(CHAT_APOLOGY));
        assert!(workflow.notifications().is_empty());
        assert!(!chat.is_pending());
    }

    #[test]
    fn test_context_from_current_result() {
        let (service, workflow, chat) = setup();
        block_on(chat.send("before analysis"));

        workflow.set_resume(Some(UploadFile::new("cv.pdf", "application/pdf", vec![0; 8])));
        block_on(workflow.submit());
        block_on(chat.send("after analysis"));

        let calls = service.chat_calls.borrow();
        assert_eq!(calls[0].1, ChatContext::default());
        assert_eq!(calls[1].1.score, Some(72.0));
        assert_eq!(calls[1].1.missing_keywords, vec!["docker", "graphql"]);
    }

    #[test]
    fn test_second_send_while_pending_is_rejected() {
        let (service, _, chat) = setup();
        let (release, gate) = oneshot::channel();
        service.hold_next_chat(gate);

        let mut pool = LocalPool::new();
        let first = chat.clone();
        pool.spawner()
            .spawn_local(async move {
                first.send("one").await;
            })
            .unwrap();
        pool.run_until_stalled();
        assert!(chat.is_pending());

        assert!(!pool.run_until(chat.send("two")));

        release.send(()).unwrap();
        pool.run_until_stalled();
        let roles: Vec<_> = chat.transcript().into_iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
        );
    }

    #[test]
    fn test_observers_see_pending_flag() {
        let (service, _, chat) = setup();
        service.push_chat(Ok("ok".into()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let handle = chat.clone();
        chat.subscribe(move |items| sink.borrow_mut().push((items.len(), handle.is_pending())));

        block_on(chat.send("   "));
        assert!(seen.borrow().is_empty());

        block_on(chat.send("hi"));
        assert_eq!(*seen.borrow(), vec![(2, true), (3, false)]);
    }
}
