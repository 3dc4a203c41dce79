//! 解析履歴ストア
//!
//! 完了した解析を新しい順に最大 [`MAX_HISTORY`] 件保持し、
//! 変更のたびに永続キーバリュー面へ同期的に書き出す。
//! 書き出しに失敗した変更はメモリにも反映しない（両者は常に一致する）。

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::observe::{emit, Observers, SubscriptionId};
use crate::storage::KeyValueStore;
use crate::types::AnalysisPayload;

/// 保持する履歴の上限
pub const MAX_HISTORY: usize = 10;

/// 永続化に使うキー
pub const HISTORY_KEY: &str = "ats_history";

/// 履歴エントリ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// 作成時刻から導出したID
    pub id: String,
    /// 作成時刻（UNIXエポックミリ秒）
    pub created_at: i64,
    pub file_name: String,
    pub score: f64,
    pub candidate_name: String,
    pub result: AnalysisPayload,
}

impl HistoryEntry {
    /// 解析結果からエントリを作る
    pub fn from_result(created_at: i64, file_name: impl Into<String>, result: AnalysisPayload) -> Self {
        Self {
            id: created_at.to_string(),
            created_at,
            file_name: file_name.into(),
            score: result.overall_score().unwrap_or(0.0),
            candidate_name: result.candidate_name(),
            result,
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: Vec<HistoryEntry>,
    observers: Observers<[HistoryEntry]>,
}

/// 履歴ストア（UIスレッド内で共有するハンドル）
#[derive(Clone)]
pub struct HistoryStore {
    inner: Rc<RefCell<Inner>>,
    storage: Rc<dyn KeyValueStore>,
}

impl HistoryStore {
    /// 永続面から復元する
    ///
    /// 記録がない・壊れている場合は空で始める（エラーにしない）。
    pub fn load(storage: Rc<dyn KeyValueStore>) -> Self {
        let entries = match storage.get(HISTORY_KEY) {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(mut entries) => {
                    entries.truncate(MAX_HISTORY);
                    entries
                }
                Err(e) => {
                    log::warn!("history record is unreadable, starting empty: {}", e);
                    Vec::new()
                }
            },
        };
        log::debug!("history loaded: {} entries", entries.len());
        Self {
            inner: Rc::new(RefCell::new(Inner {
                entries,
                observers: Observers::default(),
            })),
            storage,
        }
    }

    /// 先頭に追加し、上限を超えた古いものを捨てる
    pub fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut next = self.entries();
        next.insert(0, entry);
        next.truncate(MAX_HISTORY);
        self.commit(next)
    }

    /// IDで削除（なければ何もしない）
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut next = self.entries();
        let before = next.len();
        next.retain(|e| e.id != id);
        if next.len() == before {
            return Ok(());
        }
        self.commit(next)
    }

    /// すべて削除し、永続記録も消す
    pub fn clear(&self) -> Result<()> {
        self.storage.remove(HISTORY_KEY)?;
        self.replace(Vec::new());
        Ok(())
    }

    /// 新しい順の全エントリ
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.inner.borrow().entries.clone()
    }

    pub fn get(&self, id: &str) -> Option<HistoryEntry> {
        self.inner
            .borrow()
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// 最新エントリの作成時刻
    pub fn latest_created_at(&self) -> Option<i64> {
        self.inner.borrow().entries.first().map(|e| e.created_at)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    pub fn subscribe(&self, callback: impl Fn(&[HistoryEntry]) + 'static) -> SubscriptionId {
        self.inner.borrow_mut().observers.add(Rc::new(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().observers.remove(id)
    }

    /// 永続面へ書いてからメモリを差し替える
    fn commit(&self, next: Vec<HistoryEntry>) -> Result<()> {
        let raw = serde_json::to_string(&next)?;
        self.storage.set(HISTORY_KEY, &raw)?;
        self.replace(next);
        Ok(())
    }

    fn replace(&self, next: Vec<HistoryEntry>) {
        let (callbacks, snapshot) = {
            let mut inner = self.inner.borrow_mut();
            inner.entries = next;
            (inner.observers.snapshot(), inner.entries.clone())
        };
        emit(callbacks, snapshot.as_slice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FailingStore;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::cell::Cell;

    fn entry(ts: i64, score: f64) -> HistoryEntry {
        HistoryEntry::from_result(
            ts,
            format!("resume_{}.pdf", ts),
            AnalysisPayload::new(json!({
                "results": {"overall_score": score, "candidate_name": "Jane"}
            })),
        )
    }

    fn persisted(store: &MemoryStore) -> Vec<HistoryEntry> {
        serde_json::from_str(&store.get(HISTORY_KEY).unwrap()).unwrap()
    }

    #[test]
    fn test_entry_from_result() {
        let e = entry(1_700_000_000_000, 45.0);
        assert_eq!(e.id, "1700000000000");
        assert_eq!(e.score, 45.0);
        assert_eq!(e.candidate_name, "Jane");
    }

    #[test]
    fn test_append_newest_first_and_persisted() {
        let store = MemoryStore::new();
        let history = HistoryStore::load(Rc::new(store.clone()));

        history.append(entry(1, 10.0)).unwrap();
        history.append(entry(2, 20.0)).unwrap();

        let ids: Vec<_> = history.entries().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(persisted(&store), history.entries());
    }

    #[test]
    fn test_append_evicts_oldest_beyond_max() {
        let store = MemoryStore::new();
        let history = HistoryStore::load(Rc::new(store.clone()));
        for ts in 1..=10 {
            history.append(entry(ts, 50.0)).unwrap();
        }
        assert_eq!(history.len(), MAX_HISTORY);

        history.append(entry(11, 50.0)).unwrap();

        assert_eq!(history.len(), MAX_HISTORY);
        assert!(history.get("1").is_none());
        assert_eq!(history.entries()[0].id, "11");
        assert_eq!(persisted(&store).len(), MAX_HISTORY);
    }

    #[test]
    fn test_remove_by_id() {
        let store = MemoryStore::new();
        let history = HistoryStore::load(Rc::new(store.clone()));
        history.append(entry(1, 10.0)).unwrap();
        history.append(entry(2, 20.0)).unwrap();

        history.remove("1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(persisted(&store), history.entries());

        // 存在しないIDは何もしない
        history.remove("missing").unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_clear_removes_record() {
        let store = MemoryStore::new();
        let history = HistoryStore::load(Rc::new(store.clone()));
        history.append(entry(1, 10.0)).unwrap();

        history.clear().unwrap();
        assert!(history.is_empty());
        assert!(store.get(HISTORY_KEY).is_none());
    }

    #[test]
    fn test_load_rehydrates() {
        let store = MemoryStore::new();
        {
            let history = HistoryStore::load(Rc::new(store.clone()));
            history.append(entry(1, 10.0)).unwrap();
            history.append(entry(2, 20.0)).unwrap();
        }
        let reloaded = HistoryStore::load(Rc::new(store));
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.entries()[0].id, "2");
        assert_eq!(reloaded.latest_created_at(), Some(2));
    }

    #[test]
    fn test_load_corrupt_record_degrades_to_empty() {
        let store = MemoryStore::new();
        store.set(HISTORY_KEY, "{ invalid json }").unwrap();
        let history = HistoryStore::load(Rc::new(store));
        assert!(history.is_empty());
    }

    #[test]
    fn test_load_truncates_oversized_record() {
        let store = MemoryStore::new();
        let entries: Vec<_> = (0..15).rev().map(|ts| entry(ts, 1.0)).collect();
        store
            .set(HISTORY_KEY, &serde_json::to_string(&entries).unwrap())
            .unwrap();
        let history = HistoryStore::load(Rc::new(store));
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.entries()[0].id, "14");
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let history = HistoryStore::load(Rc::new(FailingStore));
        assert!(history.append(entry(1, 10.0)).is_err());
        assert!(history.is_empty());
        assert!(history.clear().is_err());
    }

    #[test]
    fn test_persisted_matches_memory_for_mixed_sequence() {
        let store = MemoryStore::new();
        let history = HistoryStore::load(Rc::new(store.clone()));
        for ts in 1..=14 {
            history.append(entry(ts, ts as f64)).unwrap();
            if ts % 4 == 0 {
                history.remove(&(ts - 1).to_string()).unwrap();
            }
            assert!(history.len() <= MAX_HISTORY);
            assert_eq!(persisted(&store), history.entries());
        }
    }

    #[test]
    fn test_subscribers_notified_after_persist() {
        let store = MemoryStore::new();
        let history = HistoryStore::load(Rc::new(store.clone()));
        let seen = Rc::new(Cell::new(0usize));
        let sink = seen.clone();
        let probe = store.clone();
        history.subscribe(move |entries| {
            // 購読者が呼ばれる時点で永続面は更新済み
            let raw = probe.get(HISTORY_KEY).unwrap_or_default();
            let stored: Vec<HistoryEntry> = serde_json::from_str(&raw).unwrap_or_default();
            assert_eq!(stored.len(), entries.len());
            sink.set(entries.len());
        });

        history.append(entry(1, 10.0)).unwrap();
        assert_eq!(seen.get(), 1);
    }
}
