use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormFillError {
    #[error("Invalid template configuration: {0}")]
    Configuration(String),

    #[error("Failed to open PDF {path}: {reason}")]
    DocumentOpen { path: PathBuf, reason: String },

    #[error("Malformed record data: {0}")]
    DataShape(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormFillError {
    pub(crate) fn open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        FormFillError::DocumentOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
