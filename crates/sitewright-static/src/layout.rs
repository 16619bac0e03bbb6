//! Where generated sites live on disk and how they are addressed.

use std::fs;
use std::path::PathBuf;

use sitewright_store::files::is_plain_name;
use uuid::Uuid;

use crate::error::SiteError;

/// Rendered markup file inside a generated site.
pub const SITE_INDEX_FILE: &str = "index.html";

/// Stylesheet copy inside a generated site.
pub const SITE_STYLESHEET_FILE: &str = "style.css";

/// URL path under which generated sites are served.
pub const DEFAULT_PUBLIC_PREFIX: &str = "/public/sites";

/// Directory layout for generated sites.
///
/// `staging_dir` must be on the same filesystem as `sites_dir` so that a
/// finished build can be promoted with a rename.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    /// Final site directories, one per record id
    pub sites_dir: PathBuf,

    /// Scratch directories for builds in progress
    pub staging_dir: PathBuf,

    /// URL path prefix recorded as the output location
    pub public_prefix: String,
}

impl SiteLayout {
    pub fn new(sites_dir: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            sites_dir: sites_dir.into(),
            staging_dir: staging_dir.into(),
            public_prefix: DEFAULT_PUBLIC_PREFIX.to_string(),
        }
    }

    /// Create the site and staging roots.
    pub fn ensure(&self) -> Result<(), SiteError> {
        for dir in [&self.sites_dir, &self.staging_dir] {
            fs::create_dir_all(dir).map_err(|e| SiteError::io(dir, e))?;
        }
        Ok(())
    }

    /// Final directory for a record's site.
    ///
    /// Ids that are not a single plain path segment would resolve to the
    /// sites root or outside it, so they never name a site.
    pub fn site_dir(&self, record_id: &str) -> Result<PathBuf, SiteError> {
        Ok(self.sites_dir.join(checked_id(record_id)?))
    }

    /// A fresh, unique scratch path for one build attempt.
    pub fn staging_path(&self, record_id: &str, purpose: &str) -> Result<PathBuf, SiteError> {
        let record_id = checked_id(record_id)?;
        Ok(self
            .staging_dir
            .join(format!("{record_id}.{purpose}.{}", Uuid::new_v4().simple())))
    }

    /// Output location recorded for a record's site.
    pub fn location_for(&self, record_id: &str) -> String {
        format!("{}/{}", self.public_prefix.trim_end_matches('/'), record_id)
    }

    /// Directory an output location refers to, if it belongs to this layout.
    pub fn dir_for_location(&self, location: &str) -> Option<PathBuf> {
        let prefix = self.public_prefix.trim_end_matches('/');
        let id = location.strip_prefix(prefix)?.strip_prefix('/')?;
        self.site_dir(id.trim_end_matches('/')).ok()
    }
}

fn checked_id(record_id: &str) -> Result<&str, SiteError> {
    if is_plain_name(record_id) {
        Ok(record_id)
    } else {
        Err(SiteError::RecordNotFound(record_id.to_string()))
    }
}
