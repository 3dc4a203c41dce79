use crate::error::{AtsCliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 解析サービスURLを上書きする環境変数
pub const API_URL_ENV: &str = "RESUME_ATS_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub log_level: String,
    /// 履歴ストアの保存先（未指定ならデータディレクトリ）
    pub history_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".into(),
            timeout_seconds: resume_ats_common::REQUEST_TIMEOUT.as_secs(),
            max_retries: resume_ats_common::service::MAX_RETRIES,
            log_level: "info".into(),
            history_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| AtsCliError::Config("設定ディレクトリが見つかりません".into()))?;
        Ok(dir.join("resume-ats").join("config.json"))
    }

    /// 解析サービスのURL（環境変数を優先）
    pub fn api_url(&self) -> String {
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            _ => self.api_url.trim_end_matches('/').to_string(),
        }
    }

    /// 履歴ストアのファイルパス
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.history_path {
            return Ok(path.clone());
        }
        let data = dirs::data_dir()
            .ok_or_else(|| AtsCliError::Config("データディレクトリが見つかりません".into()))?;
        Ok(data.join("resume-ats").join("store.json"))
    }

    pub fn set_api_url(&mut self, url: String) -> Result<()> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AtsCliError::Config(format!("URLが不正です: {}", url)));
        }
        self.api_url = url;
        self.save()
    }
}
