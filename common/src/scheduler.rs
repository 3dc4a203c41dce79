//! 遅延実行スケジューラ
//!
//! 通知の自動消去と段階的な進捗キャプションで使う。
//! UIスレッド1本で動く前提なので `Send` は要求しない。
//!
//! 実装:
//! - [`ManualScheduler`]: 仮想時計（テスト・決定的な実行用）
//! - CLI: tokio の `spawn_local` + `sleep`
//! - ブラウザ: gloo の `TimeoutFuture`

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// 遅延タスク
pub type Task = Box<dyn FnOnce()>;

/// 予約済みタイマーのハンドル
///
/// `cancel` はハンドルを消費するので、同じタイマーを二度取り消すことはない。
/// 発火済みのタイマーを取り消しても何も起きない。
/// ハンドルを捨てるだけではタイマーは止まらない。
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

pub trait Scheduler {
    /// `delay` 後に `task` を実行する
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;

    /// 現在時刻（UNIXエポックからのミリ秒）
    fn now_millis(&self) -> i64;
}

#[derive(Default)]
struct ManualInner {
    epoch_millis: i64,
    elapsed: Duration,
    next_seq: u64,
    pending: BTreeMap<(Duration, u64), Task>,
}

/// 仮想時計で動くスケジューラ
///
/// `advance` で時間を進めると、期限が来たタスクを期限順に実行する。
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<ManualInner>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定したエポックミリ秒から始まる時計
    pub fn starting_at(epoch_millis: i64) -> Self {
        let scheduler = Self::default();
        scheduler.inner.borrow_mut().epoch_millis = epoch_millis;
        scheduler
    }

    /// 時間を進め、期限の来たタスクを順に実行する
    pub fn advance(&self, by: Duration) {
        let target = self.inner.borrow().elapsed + by;
        loop {
            // 実行中のタスクが再予約できるよう、借用を解いてから呼ぶ
            let next = {
                let mut inner = self.inner.borrow_mut();
                let key = match inner.pending.keys().next() {
                    Some(key) if key.0 <= target => *key,
                    _ => break,
                };
                inner.elapsed = key.0;
                inner.pending.remove(&key)
            };
            if let Some(task) = next {
                task();
            }
        }
        self.inner.borrow_mut().elapsed = target;
    }

    /// 未発火のタスク数
    pub fn pending_count(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.borrow().elapsed
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let key = {
            let mut inner = self.inner.borrow_mut();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            let key = (inner.elapsed + delay, seq);
            inner.pending.insert(key, task);
            key
        };
        let weak: Weak<RefCell<ManualInner>> = Rc::downgrade(&self.inner);
        TimerHandle::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().pending.remove(&key);
            }
        })
    }

    fn now_millis(&self) -> i64 {
        let inner = self.inner.borrow();
        inner.epoch_millis + inner.elapsed.as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_tasks_fire_in_due_order() {
        let scheduler = ManualScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (delay, label) in [(300, "c"), (100, "a"), (200, "b")] {
            let log = log.clone();
            scheduler.schedule(
                Duration::from_millis(delay),
                Box::new(move || log.borrow_mut().push(label)),
            );
        }

        scheduler.advance(Duration::from_millis(150));
        assert_eq!(*log.borrow(), vec!["a"]);

        scheduler.advance(Duration::from_millis(500));
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let scheduler = ManualScheduler::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let handle = scheduler.schedule(Duration::from_millis(10), Box::new(move || flag.set(true)));

        handle.cancel();
        scheduler.advance(Duration::from_secs(1));

        assert!(!fired.get());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let scheduler = ManualScheduler::new();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let handle = scheduler.schedule(
            Duration::from_millis(10),
            Box::new(move || counter.set(counter.get() + 1)),
        );

        scheduler.advance(Duration::from_millis(10));
        handle.cancel();
        scheduler.advance(Duration::from_millis(10));

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_task_can_reschedule_during_advance() {
        let scheduler = ManualScheduler::new();
        let count = Rc::new(Cell::new(0));

        let inner_scheduler = scheduler.clone();
        let counter = count.clone();
        scheduler.schedule(
            Duration::from_millis(10),
            Box::new(move || {
                counter.set(counter.get() + 1);
                let counter = counter.clone();
                inner_scheduler.schedule(
                    Duration::from_millis(10),
                    Box::new(move || counter.set(counter.get() + 1)),
                );
            }),
        );

        scheduler.advance(Duration::from_millis(25));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_now_millis_tracks_virtual_time() {
        let scheduler = ManualScheduler::starting_at(1_700_000_000_000);
        scheduler.advance(Duration::from_millis(1500));
        assert_eq!(scheduler.now_millis(), 1_700_000_001_500);
    }
}
