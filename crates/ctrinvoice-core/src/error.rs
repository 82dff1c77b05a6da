use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CtrError {
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("no tokens to classify from {0}")]
    NoTokens(String),

    #[error("token extraction failed: {0}")]
    Extraction(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("failed to load layout from {path}: {reason}")]
    LayoutLoad { path: PathBuf, reason: String },

    #[error("invalid layout: {0}")]
    LayoutInvalid(String),

    #[error("failed to load projection from {path}: {reason}")]
    ProjectionLoad { path: PathBuf, reason: String },

    #[error("invalid projection: {0}")]
    ProjectionInvalid(String),

    #[error("'{text}' does not match date format '{format}'")]
    DateFormat { text: String, format: String },

    #[error("invalid xlsx template: {0}")]
    Template(String),

    #[error("tag store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CtrError {
    /// True for the "nothing to process" condition, as opposed to a failure mid-run.
    pub fn is_source_missing(&self) -> bool {
        matches!(self, CtrError::SourceNotFound(_) | CtrError::NoTokens(_))
    }
}
