//! 購読者リスト
//!
//! 通知キュー・履歴・セッション状態の変更を表示層へ流す。
//! 呼び出し側は `RefCell` の借用を解いてから [`Observers::snapshot`] の
//! 結果を呼ぶこと（購読者が状態を読みに来ても二重借用にならない）。

use std::rc::Rc;

/// 購読解除用ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Callback<T> = Rc<dyn Fn(&T)>;

pub struct Observers<T: ?Sized> {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T: ?Sized> Default for Observers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            callbacks: Vec::new(),
        }
    }
}

impl<T: ?Sized> Observers<T> {
    pub fn add(&mut self, callback: Callback<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, callback));
        id
    }

    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(sid, _)| *sid != id);
        self.callbacks.len() != before
    }

    pub fn snapshot(&self) -> Vec<Callback<T>> {
        self.callbacks.iter().map(|(_, cb)| cb.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// 借用の外で購読者に配る
pub fn emit<T: ?Sized>(callbacks: Vec<Callback<T>>, value: &T) {
    for callback in callbacks {
        callback(value);
    }
}
