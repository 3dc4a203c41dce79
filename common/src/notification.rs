//! 通知キュー
//!
//! - 表示中は最大 [`MAX_VISIBLE`] 件、新しいものが先頭
//! - 表示中に同じ (title, description) があれば追加しない
//! - TTL経過、手動の `dismiss`、容量超過による切り捨てのどれで消えても、
//!   そのエントリのタイマーはちょうど一度だけ片付く

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::observe::{emit, Observers, SubscriptionId};
use crate::scheduler::{Scheduler, TimerHandle};

/// 同時に表示する通知の上限
pub const MAX_VISIBLE: usize = 3;

/// 既定の表示時間
pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Success => "✓",
            Severity::Error => "✕",
            Severity::Warning => "⚠",
            Severity::Info => "ℹ",
        }
    }
}

/// 通知ID（単調増加）
pub type NotificationId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(with = "ttl_millis")]
    pub ttl: Duration,
}

mod ttl_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(ttl: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(ttl.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

struct Entry {
    notification: Notification,
    timer: Option<TimerHandle>,
}

#[derive(Default)]
struct Inner {
    queue: Vec<Entry>,
    next_id: NotificationId,
    observers: Observers<[Notification]>,
}

impl Inner {
    fn snapshot(&self) -> Vec<Notification> {
        self.queue.iter().map(|e| e.notification.clone()).collect()
    }
}

enum Removal {
    Expired,
    Dismissed,
}

/// 通知キュー（UIスレッド内で共有するハンドル）
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Rc<RefCell<Inner>>,
    scheduler: Rc<dyn Scheduler>,
}

impl NotificationCenter {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                next_id: 1,
                ..Inner::default()
            })),
            scheduler,
        }
    }

    /// 通知を追加
    ///
    /// 表示中に同じタイトル・本文があれば何もせず `None` を返す。
    pub fn notify(
        &self,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Option<NotificationId> {
        let title = title.into();
        let description = description.into();
        let ttl = ttl.unwrap_or(DEFAULT_TTL);

        let id = {
            let mut inner = self.inner.borrow_mut();
            let duplicate = inner.queue.iter().any(|e| {
                e.notification.title == title && e.notification.description == description
            });
            if duplicate {
                log::debug!("notification dropped as duplicate: {}", title);
                return None;
            }
            let id = inner.next_id;
            inner.next_id += 1;
            id
        };

        let weak: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);
        let timer = self.scheduler.schedule(
            ttl,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    remove(&inner, id, Removal::Expired);
                }
            }),
        );

        let (callbacks, snapshot) = {
            let mut inner = self.inner.borrow_mut();
            inner.queue.insert(
                0,
                Entry {
                    notification: Notification {
                        id,
                        severity,
                        title,
                        description,
                        ttl,
                    },
                    timer: Some(timer),
                },
            );
            if inner.queue.len() > MAX_VISIBLE {
                // 押し出された古い通知のタイマーも止める
                for dropped in inner.queue.drain(MAX_VISIBLE..) {
                    if let Some(timer) = dropped.timer {
                        timer.cancel();
                    }
                }
            }
            (inner.observers.snapshot(), inner.snapshot())
        };
        emit(callbacks, snapshot.as_slice());
        Some(id)
    }

    pub fn success(&self, title: impl Into<String>, description: impl Into<String>) -> Option<NotificationId> {
        self.notify(Severity::Success, title, description, None)
    }

    pub fn error(&self, title: impl Into<String>, description: impl Into<String>) -> Option<NotificationId> {
        self.notify(Severity::Error, title, description, None)
    }

    pub fn warning(&self, title: impl Into<String>, description: impl Into<String>) -> Option<NotificationId> {
        self.notify(Severity::Warning, title, description, None)
    }

    pub fn info(&self, title: impl Into<String>, description: impl Into<String>) -> Option<NotificationId> {
        self.notify(Severity::Info, title, description, None)
    }

    /// 即座に消す（存在しないIDなら何もしない）
    pub fn dismiss(&self, id: NotificationId) {
        remove(&self.inner, id, Removal::Dismissed);
    }

    /// 現在の表示キュー（新しい順）
    pub fn snapshot(&self) -> Vec<Notification> {
        self.inner.borrow().snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().queue.is_empty()
    }

    /// キューが変わるたびに呼ばれる
    pub fn subscribe(&self, callback: impl Fn(&[Notification]) + 'static) -> SubscriptionId {
        self.inner.borrow_mut().observers.add(Rc::new(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().observers.remove(id)
    }
}

fn remove(inner: &Rc<RefCell<Inner>>, id: NotificationId, cause: Removal) {
    let (callbacks, snapshot) = {
        let mut guard = inner.borrow_mut();
        let Some(pos) = guard.queue.iter().position(|e| e.notification.id == id) else {
            return;
        };
        let entry = guard.queue.remove(pos);
        match cause {
            Removal::Dismissed => {
                if let Some(timer) = entry.timer {
                    timer.cancel();
                }
            }
            // 発火中のタイマーなので取り消し不要
            Removal::Expired => {}
        }
        (guard.observers.snapshot(), guard.snapshot())
    };
    emit(callbacks, snapshot.as_slice());
}
