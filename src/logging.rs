//! ログ初期化
//!
//! 標準エラーへ出力する。`RUST_LOG` があればそちらを優先。

use flexi_logger::{Logger, LoggerHandle};

use crate::error::{AtsCliError, Result};

/// レベル指定を正規化する（不明な値は `info`）
pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        "off" => "off",
        _ => "info",
    }
}

/// ロガーを起動する。返したハンドルが生きている間だけ出力される。
pub fn init_logging(level: &str, verbose: bool) -> Result<LoggerHandle> {
    let level = if verbose { "debug" } else { normalize_level(level) };
    Logger::try_with_env_or_str(level)
        .map_err(|err| AtsCliError::Logging(format!("invalid log level `{level}`: {err}")))?
        .log_to_stderr()
        .format(flexi_logger::default_format)
        .start()
        .map_err(|err| AtsCliError::Logging(format!("failed to start logger: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level("DEBUG"), "debug");
        assert_eq!(normalize_level("warning"), "warn");
        assert_eq!(normalize_level("verbose"), "info");
    }
}
