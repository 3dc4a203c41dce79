//! resume-ats CLI
//!
//! 共通ライブラリのセッションを、HTTPクライアント・JSONファイルストア・
//! tokioタイマーで結線する。

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod file_store;
pub mod logging;
pub mod runtime;
pub mod upload;
