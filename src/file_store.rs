//! JSONファイルを実体とするキーバリューストア
//!
//! 書き込みは一時ファイルに書いてから置き換えるので、
//! 途中で止まっても壊れた記録は残らない。

use resume_ats_common::{Error as CommonError, KeyValueStore};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub struct JsonFileStore {
    path: PathBuf,
    values: RefCell<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// ファイルを開く（なければ空、壊れていれば空として扱う）
    pub fn open(path: &Path) -> Self {
        let values = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("store file {} is unreadable, starting empty: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: path.to_path_buf(),
            values: RefCell::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> resume_ats_common::Result<()> {
        let storage_error = |e: std::io::Error| {
            CommonError::Storage(format!("{}: {}", self.path.display(), e))
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(storage_error)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(storage_error)?;
        std::fs::rename(&tmp, &self.path).map_err(storage_error)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> resume_ats_common::Result<()> {
        let mut next = self.values.borrow().clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *self.values.borrow_mut() = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> resume_ats_common::Result<()> {
        let mut next = self.values.borrow().clone();
        if next.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&next)?;
        *self.values.borrow_mut() = next;
        Ok(())
    }
}
