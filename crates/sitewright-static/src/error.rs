//! Errors raised while generating, packaging and previewing sites.

use std::path::PathBuf;

use sitewright_store::StoreError;

/// Errors that can occur in the site pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template {id} is missing its {missing}")]
    InvalidTemplate { id: String, missing: &'static str },

    #[error("Uploaded image not found: {0}")]
    ImageNotFound(String),

    #[error("Site record not found: {0}")]
    RecordNotFound(String),

    #[error("Site not generated yet: {0}")]
    NotGenerated(String),

    #[error("Failed to render template: {0}")]
    Render(String),

    #[error("Failed to package site: {0}")]
    Package(String),

    #[error("Template store error: {0}")]
    Store(StoreError),

    #[error("Record store error: {0}")]
    Records(String),

    #[error("I/O failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SiteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<StoreError> for SiteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SiteError::TemplateNotFound(id),
            StoreError::InvalidTemplate { id, missing } => SiteError::InvalidTemplate { id, missing },
            other => SiteError::Store(other),
        }
    }
}

impl From<minijinja::Error> for SiteError {
    fn from(err: minijinja::Error) -> Self {
        SiteError::Render(err.to_string())
    }
}
