//! Errors raised by the template store.

use std::path::PathBuf;

/// Errors that can occur while managing template slots.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template already exists: {0}")]
    Conflict(String),

    #[error("Template {id} is missing its {missing}")]
    InvalidTemplate { id: String, missing: &'static str },

    #[error("No valid files uploaded (expected index.ejs, style.css, or an image)")]
    NoValidFiles,

    #[error("Invalid template id: {0:?}")]
    InvalidId(String),

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("I/O failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
