//! Preview addresses for generated sites.

use crate::error::SiteError;
use crate::layout::SITE_INDEX_FILE;
use crate::record::SiteRecord;

/// Maps a record's output location to a browsable URL.
#[derive(Debug, Clone)]
pub struct PreviewResolver {
    base_url: String,
}

impl PreviewResolver {
    /// `base_url` is the public origin sites are served from, e.g.
    /// `http://localhost:5000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    /// Preview URL for a generated record.
    pub fn resolve(&self, record: &SiteRecord) -> Result<String, SiteError> {
        let location = record
            .output_location()
            .ok_or_else(|| SiteError::NotGenerated(record.id.clone()))?;

        Ok(format!(
            "{}{}/{}",
            self.base_url,
            location.trim_end_matches('/'),
            SITE_INDEX_FILE
        ))
    }
}
