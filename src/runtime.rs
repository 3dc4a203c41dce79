//! tokio上のタイマー
//!
//! `spawn_local` を使うので `LocalSet` の中で呼ぶこと。

use resume_ats_common::scheduler::Task;
use resume_ats_common::{Scheduler, TimerHandle};
use std::time::Duration;

pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        TimerHandle::new(move || handle.abort())
    }

    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
