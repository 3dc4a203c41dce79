//! アップロードファイルの検証
//!
//! MIMEタイプが信用できない環境（空文字や application/octet-stream）では
//! 拡張子で判定する。

use std::rc::Rc;
use thiserror::Error;

/// 受け付けるファイルサイズの上限（10MB）
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// 受け付けるMIMEタイプ
pub const ACCEPTED_MIME_TYPES: [&str; 3] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/msword",
];

/// MIMEタイプが使えない場合の拡張子
pub const ACCEPTED_EXTENSIONS: [&str; 3] = [".pdf", ".docx", ".doc"];

/// 検証エラー
///
/// Display文字列はそのまま画面のインラインメッセージに使う。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a resume file to analyze.")]
    MissingResume,

    #[error("{name} is not supported. Please select a PDF or DOCX file.")]
    UnsupportedFormat { name: String },

    #[error("{name} is {size} bytes. Please upload a file smaller than 10 MB.")]
    FileTooLarge { name: String, size: u64 },

    #[error("Input is empty.")]
    EmptyInput,
}

impl ValidationError {
    /// 通知のタイトル
    pub fn title(&self) -> &'static str {
        match self {
            ValidationError::MissingResume => "No Resume Selected",
            ValidationError::UnsupportedFormat { .. } => "Unsupported File Type",
            ValidationError::FileTooLarge { .. } => "File Too Large",
            ValidationError::EmptyInput => "Nothing To Send",
        }
    }
}

/// ブラウザ/CLIから渡されるファイル
///
/// 中身は `Rc` で共有し、送信リクエストへの複製を安くする。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    /// 空文字はMIMEタイプ不明
    pub mime_type: String,
    pub size: u64,
    pub data: Rc<[u8]>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
            data: data.into(),
        }
    }

    /// 中身を読まずにメタデータだけで作る（サイズ判定用）
    pub fn metadata_only(name: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
            data: Rc::from(Vec::new()),
        }
    }

    /// 拡張子（小文字、ドット付き）
    pub fn extension(&self) -> Option<String> {
        let lower = self.name.to_lowercase();
        lower.rfind('.').map(|idx| lower[idx..].to_string())
    }
}

/// 職務記述書（ファイルまたはテキスト）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobDescription {
    File(UploadFile),
    Text(String),
}

impl JobDescription {
    /// 空白のみのテキストは無指定として扱う
    pub fn from_text(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(JobDescription::Text(text.to_string()))
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            JobDescription::Text(text) => Some(text),
            JobDescription::File(_) => None,
        }
    }
}

/// 形式判定: MIMEタイプ一致、または拡張子一致
pub fn has_accepted_format(file: &UploadFile) -> bool {
    let has_valid_type = ACCEPTED_MIME_TYPES.contains(&file.mime_type.as_str());
    let name = file.name.to_lowercase();
    let has_valid_extension = ACCEPTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext));
    has_valid_type || has_valid_extension
}

/// 履歴書ファイルを検証
pub fn validate_resume(file: &UploadFile) -> Result<(), ValidationError> {
    if !has_accepted_format(file) {
        return Err(ValidationError::UnsupportedFormat {
            name: file.name.clone(),
        });
    }
    if file.size > MAX_FILE_SIZE {
        return Err(ValidationError::FileTooLarge {
            name: file.name.clone(),
            size: file.size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_pdf_by_mime_type() {
        let file = UploadFile::metadata_only("resume", "application/pdf", 2 * MB);
        assert!(validate_resume(&file).is_ok());
    }

    #[test]
    fn test_docx_by_extension_without_mime() {
        let file = UploadFile::metadata_only("Resume.DOCX", "", MB);
        assert!(validate_resume(&file).is_ok());
    }

    #[test]
    fn test_doc_by_extension_with_unreliable_mime() {
        let file = UploadFile::metadata_only("cv.doc", "application/octet-stream", MB);
        assert!(validate_resume(&file).is_ok());
    }

    #[test]
    fn test_rejects_image() {
        let file = UploadFile::metadata_only("photo.png", "image/png", MB);
        let err = validate_resume(&file).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedFormat { .. }));
        assert_eq!(err.title(), "Unsupported File Type");
    }

    #[test]
    fn test_size_limit_boundary() {
        let exact = UploadFile::metadata_only("a.pdf", "application/pdf", MAX_FILE_SIZE);
        assert!(validate_resume(&exact).is_ok());

        let over = UploadFile::metadata_only("a.pdf", "application/pdf", 12 * MB);
        let err = validate_resume(&over).unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
        assert_eq!(err.title(), "File Too Large");
        assert!(err.to_string().contains("10 MB"));
    }

    #[test]
    fn test_new_computes_size() {
        let file = UploadFile::new("a.pdf", "application/pdf", vec![0u8; 42]);
        assert_eq!(file.size, 42);
        assert_eq!(file.extension().as_deref(), Some(".pdf"));
    }

    #[test]
    fn test_job_description_blank_text_is_absent() {
        assert!(JobDescription::from_text("   \n").is_none());
        let jd = JobDescription::from_text("Rust engineer").unwrap();
        assert_eq!(jd.as_text(), Some("Rust engineer"));
    }
}
