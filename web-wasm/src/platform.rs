//! ブラウザ側のタイマーと永続ストア

use futures::future::{AbortHandle, Abortable};
use gloo::timers::future::TimeoutFuture;
use resume_ats_common::scheduler::Task;
use resume_ats_common::{Error as CommonError, KeyValueStore, Scheduler, TimerHandle};
use std::time::Duration;
use wasm_bindgen_futures::spawn_local;

/// `setTimeout` によるタイマー
pub struct BrowserScheduler;

impl Scheduler for BrowserScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let (handle, registration) = AbortHandle::new_pair();
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        let timer = Abortable::new(TimeoutFuture::new(millis), registration);
        spawn_local(async move {
            if timer.await.is_ok() {
                task();
            }
        });
        TimerHandle::new(move || handle.abort())
    }

    fn now_millis(&self) -> i64 {
        js_sys::Date::now() as i64
    }
}

/// `localStorage` に文字列のまま保存する
pub struct BrowserStore;

impl BrowserStore {
    fn storage() -> resume_ats_common::Result<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or_else(|| CommonError::Storage("localStorage is unavailable".into()))
    }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage().ok()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> resume_ats_common::Result<()> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| CommonError::Storage(format!("{:?}", e)))
    }

    fn remove(&self, key: &str) -> resume_ats_common::Result<()> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| CommonError::Storage(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_browser_store_round_trip() {
        let store = BrowserStore;
        store.set("resume-ats-test", "value").unwrap();
        assert_eq!(store.get("resume-ats-test").as_deref(), Some("value"));
        store.remove("resume-ats-test").unwrap();
        assert_eq!(store.get("resume-ats-test"), None);
    }

    #[wasm_bindgen_test]
    async fn test_cancelled_timer_never_fires() {
        let fired = Rc::new(Cell::new(0));
        let a = fired.clone();
        let b = fired.clone();
        BrowserScheduler.schedule(Duration::from_millis(10), Box::new(move || a.set(a.get() + 1)));
        let handle =
            BrowserScheduler.schedule(Duration::from_millis(10), Box::new(move || b.set(b.get() + 10)));
        handle.cancel();

        TimeoutFuture::new(50).await;
        assert_eq!(fired.get(), 1);
    }
}
