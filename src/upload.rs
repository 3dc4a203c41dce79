//! ローカルファイルからアップロード用の値を作る

use resume_ats_common::validation::MAX_FILE_SIZE;
use resume_ats_common::UploadFile;
use std::path::Path;

use crate::error::{AtsCliError, Result};

/// 拡張子からMIMEタイプを推定（不明なら空文字）
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("doc") => "application/msword",
        Some("txt") => "text/plain",
        _ => "",
    }
}

/// ファイルを読み込む
///
/// 上限を超えるファイルは中身を読まず、サイズだけ持たせる
/// （送信前の検証で弾かれる）。
pub fn read_upload(path: &Path) -> Result<UploadFile> {
    if !path.is_file() {
        return Err(AtsCliError::FileNotFound(path.display().to_string()));
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let size = std::fs::metadata(path)?.len();
    if size > MAX_FILE_SIZE {
        return Ok(UploadFile::metadata_only(name, mime_for(path), size));
    }
    let data = std::fs::read(path)?;
    Ok(UploadFile::new(name, mime_for(path), data))
}
