//! Storage locations and the shared pipeline handed to request handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sitewright_static::{
    JsonRecordStore, PreviewResolver, RecordStore, SiteLayout, SitePackager, SiteRenderer,
    UploadDir,
};
use sitewright_store::{KeyedLocks, TemplateStore};

use crate::error::ApiError;
use crate::server::ServerError;

/// On-disk locations of every storage area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    /// Template slots, one directory per template
    pub templates_dir: PathBuf,

    /// Shared upload area for site images
    pub uploads_dir: PathBuf,

    /// Generated sites, one directory per content record
    pub sites_dir: PathBuf,

    /// Scratch space for builds in progress; same filesystem as `sites_dir`
    pub staging_dir: PathBuf,

    /// Content record documents
    pub records_dir: PathBuf,

    /// Temporary download archives
    pub temp_dir: PathBuf,
}

impl StoragePaths {
    /// Default layout below a single data directory.
    pub fn under(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            templates_dir: data_dir.join("templates"),
            uploads_dir: data_dir.join("uploads"),
            sites_dir: data_dir.join("sites"),
            staging_dir: data_dir.join("staging"),
            records_dir: data_dir.join("records"),
            temp_dir: data_dir.join("tmp"),
        }
    }
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::under("data")
    }
}

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub templates: Arc<TemplateStore>,
    pub records: Arc<dyn RecordStore>,
    pub uploads: Arc<UploadDir>,
    pub renderer: Arc<SiteRenderer>,
    pub packager: Arc<SitePackager>,
    pub preview: PreviewResolver,
}

impl AppState {
    /// Open every store under `paths`, creating directories as needed.
    ///
    /// `base_url` is the public origin used for preview links.
    pub fn open(paths: &StoragePaths, base_url: &str) -> Result<Self, ServerError> {
        let templates = Arc::new(
            TemplateStore::open(&paths.templates_dir)
                .map_err(|e| ServerError::Storage(e.to_string()))?,
        );
        let records: Arc<dyn RecordStore> = Arc::new(
            JsonRecordStore::open(&paths.records_dir)
                .map_err(|e| ServerError::Storage(e.to_string()))?,
        );
        let uploads = Arc::new(
            UploadDir::open(&paths.uploads_dir).map_err(|e| {
                ServerError::Storage(format!("{}: {e}", paths.uploads_dir.display()))
            })?,
        );

        let layout = SiteLayout::new(&paths.sites_dir, &paths.staging_dir);
        let sites = Arc::new(KeyedLocks::new());

        let renderer = SiteRenderer::new(
            templates.clone(),
            records.clone(),
            uploads.clone(),
            layout.clone(),
            sites.clone(),
        )
        .map_err(|e| ServerError::Storage(e.to_string()))?;
        let packager = SitePackager::new(layout, sites, &paths.temp_dir)
            .map_err(|e| ServerError::Storage(e.to_string()))?;

        Ok(Self {
            templates,
            records,
            uploads,
            renderer: Arc::new(renderer),
            packager: Arc::new(packager),
            preview: PreviewResolver::new(base_url),
        })
    }

    /// Run blocking pipeline work off the async runtime.
    pub(crate) async fn run<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(AppState) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || work(state))
            .await
            .map_err(|e| ApiError::Internal(format!("Worker task failed: {e}")))?
    }
}
