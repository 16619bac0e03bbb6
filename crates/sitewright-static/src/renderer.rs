//! Site generation.
//!
//! A build renders the template into a private staging directory, copies the
//! stylesheet and images next to it, and only then swaps the staging
//! directory into place. A failed build leaves the previous site and the
//! record's output location untouched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use sitewright_store::KeyedLocks;
use sitewright_store::TemplateStore;

use crate::error::SiteError;
use crate::layout::{SiteLayout, SITE_INDEX_FILE, SITE_STYLESHEET_FILE};
use crate::record::SiteRecord;
use crate::records::RecordStore;
use crate::templates::TemplateEngine;
use crate::uploads::UploadArea;

/// Result of a generation.
#[derive(Debug, Clone)]
pub struct GenerateResult {
    /// Output location recorded on the content record
    pub location: String,

    /// Directory holding the generated files
    pub output_dir: PathBuf,

    /// Number of images copied
    pub images: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,
}

/// Renders content records into static site directories.
pub struct SiteRenderer {
    templates: Arc<TemplateStore>,
    records: Arc<dyn RecordStore>,
    uploads: Arc<dyn UploadArea>,
    layout: SiteLayout,
    engine: TemplateEngine,
    sites: Arc<KeyedLocks>,
}

impl SiteRenderer {
    /// Create a renderer. `sites` holds the per-record leases shared with the
    /// packager.
    pub fn new(
        templates: Arc<TemplateStore>,
        records: Arc<dyn RecordStore>,
        uploads: Arc<dyn UploadArea>,
        layout: SiteLayout,
        sites: Arc<KeyedLocks>,
    ) -> Result<Self, SiteError> {
        layout.ensure()?;

        Ok(Self {
            templates,
            records,
            uploads,
            layout,
            engine: TemplateEngine::new()?,
            sites,
        })
    }

    pub fn layout(&self) -> &SiteLayout {
        &self.layout
    }

    /// Generate (or regenerate) the site for a saved record.
    pub fn generate(&self, record: &SiteRecord) -> Result<GenerateResult, SiteError> {
        let start = Instant::now();
        let output_dir = self.layout.site_dir(&record.id)?;

        let lease = self.sites.lease(&record.id);
        let _guard = lease.write();

        // Templates are read once; edits made during the build apply next time.
        let template = self.templates.snapshot(&record.template_id)?;

        let html = self.engine.render_site(&template.markup, record)?;

        let staging = StagingDir::create(self.layout.staging_path(&record.id, "build")?)?;
        write(&staging.path().join(SITE_INDEX_FILE), html.as_bytes())?;
        write(&staging.path().join(SITE_STYLESHEET_FILE), &template.stylesheet)?;

        for image in &record.images {
            if !is_file_name(image) {
                return Err(SiteError::ImageNotFound(image.clone()));
            }
            let bytes = self.uploads.resolve(image).map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => SiteError::ImageNotFound(image.clone()),
                _ => SiteError::io(image, e),
            })?;
            write(&staging.path().join(image), &bytes)?;
        }

        self.promote(staging, &output_dir, &record.id)?;

        let location = self.layout.location_for(&record.id);
        self.records.update_output_location(&record.id, &location)?;

        let result = GenerateResult {
            location,
            output_dir,
            images: record.images.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Generated site {} from template {} ({} images) in {}ms",
            record.id,
            record.template_id,
            result.images,
            result.duration_ms
        );

        Ok(result)
    }

    /// Load a record by id and generate its site.
    pub fn generate_by_id(&self, id: &str) -> Result<GenerateResult, SiteError> {
        let record = self.records.find_by_id(id)?;
        self.generate(&record)
    }

    /// Swap a finished staging directory into the final path.
    fn promote(&self, staging: StagingDir, output_dir: &Path, id: &str) -> Result<(), SiteError> {
        let retired = if output_dir.exists() {
            let retired = self.layout.staging_path(id, "retired")?;
            fs::rename(output_dir, &retired).map_err(|e| SiteError::io(output_dir, e))?;
            Some(retired)
        } else {
            None
        };

        if let Err(e) = fs::rename(staging.path(), output_dir) {
            if let Some(retired) = &retired {
                if let Err(restore) = fs::rename(retired, output_dir) {
                    tracing::warn!("Failed to restore previous site {}: {}", id, restore);
                }
            }
            return Err(SiteError::io(output_dir, e));
        }
        staging.release();

        if let Some(retired) = retired {
            if let Err(e) = fs::remove_dir_all(&retired) {
                tracing::warn!("Failed to remove old site {}: {}", retired.display(), e);
            }
        }

        Ok(())
    }
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), SiteError> {
    fs::write(path, bytes).map_err(|e| SiteError::io(path, e))
}

/// Image names must not escape the output directory or shadow site files.
fn is_file_name(name: &str) -> bool {
    sitewright_store::files::is_plain_name(name)
        && name != SITE_INDEX_FILE
        && name != SITE_STYLESHEET_FILE
}

/// A build directory removed on drop unless released.
struct StagingDir {
    path: PathBuf,
    keep: bool,
}

impl StagingDir {
    fn create(path: PathBuf) -> Result<Self, SiteError> {
        fs::create_dir_all(&path).map_err(|e| SiteError::io(&path, e))?;
        Ok(Self { path, keep: false })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The directory was moved elsewhere; nothing to clean up.
    fn release(mut self) {
        self.keep = true;
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.keep && self.path.exists() {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                tracing::warn!("Failed to remove staging {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::records::JsonRecordStore;
    use crate::uploads::UploadDir;
    use pretty_assertions::assert_eq;
    use sitewright_store::UploadedFile;
    use tempfile::{tempdir, TempDir};

    pub(crate) struct Fixture {
        pub temp: TempDir,
        pub templates: Arc<TemplateStore>,
        pub records: Arc<JsonRecordStore>,
        pub uploads: Arc<UploadDir>,
        pub layout: SiteLayout,
        pub sites: Arc<KeyedLocks>,
        pub renderer: SiteRenderer,
    }

    impl Fixture {
        pub(crate) fn new() -> Self {
            let temp = tempdir().unwrap();
            let templates = Arc::new(TemplateStore::open(temp.path().join("templates")).unwrap());
            let records = Arc::new(JsonRecordStore::open(temp.path().join("records")).unwrap());
            let uploads = Arc::new(UploadDir::open(temp.path().join("uploads")).unwrap());
            let layout = SiteLayout::new(temp.path().join("sites"), temp.path().join("staging"));
            let sites = Arc::new(KeyedLocks::new());

            templates
                .put_direct(
                    Some("t1"),
                    &[
                        UploadedFile::new("index.ejs", None, "<h1><%=name%></h1>"),
                        UploadedFile::new("style.css", Some("text/css"), "h1 { color: teal; }"),
                    ],
                    None,
                )
                .unwrap();

            let renderer = SiteRenderer::new(
                templates.clone(),
                records.clone(),
                uploads.clone(),
                layout.clone(),
                sites.clone(),
            )
            .unwrap();

            Self {
                temp,
                templates,
                records,
                uploads,
                layout,
                sites,
                renderer,
            }
        }

        pub(crate) fn saved(&self, record: SiteRecord) -> SiteRecord {
            let id = self.records.save(record).unwrap();
            self.records.find_by_id(&id).unwrap()
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn generates_markup_and_stylesheet_only() {
        let fx = Fixture::new();
        let record = fx.saved(SiteRecord::new("Acme", "t1"));

        let result = fx.renderer.generate(&record).unwrap();

        assert_eq!(result.location, format!("/public/sites/{}", record.id));
        assert_eq!(
            fs::read_to_string(result.output_dir.join(SITE_INDEX_FILE)).unwrap(),
            "<h1>Acme</h1>"
        );
        assert_eq!(file_names(&result.output_dir), vec!["index.html", "style.css"]);
        assert_eq!(
            fx.records.find_by_id(&record.id).unwrap().output_location(),
            Some(result.location.as_str())
        );
    }

    #[test]
    fn copies_referenced_images() {
        let fx = Fixture::new();
        let stored = fx.uploads.store("front.jpg", b"jpeg bytes").unwrap();
        let mut record = SiteRecord::new("Acme", "t1");
        record.images = vec![stored.clone()];
        let record = fx.saved(record);

        let result = fx.renderer.generate(&record).unwrap();

        assert_eq!(result.images, 1);
        assert_eq!(fs::read(result.output_dir.join(&stored)).unwrap(), b"jpeg bytes");
    }

    #[test]
    fn regeneration_is_byte_identical_and_replaces_output() {
        let fx = Fixture::new();
        let record = fx.saved(SiteRecord::new("Acme", "t1"));

        let first = fx.renderer.generate(&record).unwrap();
        let first_html = fs::read(first.output_dir.join(SITE_INDEX_FILE)).unwrap();
        fs::write(first.output_dir.join("stale.txt"), "left over").unwrap();

        let second = fx.renderer.generate(&record).unwrap();
        let second_html = fs::read(second.output_dir.join(SITE_INDEX_FILE)).unwrap();

        assert_eq!(first_html, second_html);
        assert_eq!(first.location, second.location);
        assert!(!second.output_dir.join("stale.txt").exists());
        assert!(file_names(&fx.layout.staging_dir).is_empty());
    }

    #[test]
    fn missing_image_keeps_previous_site() {
        let fx = Fixture::new();
        let record = fx.saved(SiteRecord::new("Acme", "t1"));
        let first = fx.renderer.generate(&record).unwrap();

        let mut broken = record.clone();
        broken.name = "Changed".to_string();
        broken.images = vec!["12345-missing.png".to_string()];
        let result = fx.renderer.generate(&broken);

        assert!(matches!(result, Err(SiteError::ImageNotFound(name)) if name == "12345-missing.png"));
        assert_eq!(
            fs::read_to_string(first.output_dir.join(SITE_INDEX_FILE)).unwrap(),
            "<h1>Acme</h1>"
        );
        assert!(file_names(&fx.layout.staging_dir).is_empty());
    }

    #[test]
    fn failed_first_generation_sets_no_location() {
        let fx = Fixture::new();
        let mut record = SiteRecord::new("Acme", "t1");
        record.images = vec!["nope.png".to_string()];
        let record = fx.saved(record);

        assert!(fx.renderer.generate(&record).is_err());

        assert_eq!(fx.records.find_by_id(&record.id).unwrap().output_location(), None);
        assert!(!fx.layout.site_dir(&record.id).unwrap().exists());
    }

    #[test]
    fn unknown_and_incomplete_templates_fail() {
        let fx = Fixture::new();
        fx.templates
            .put_direct(
                Some("no-css"),
                &[UploadedFile::new("index.ejs", None, "<p></p>")],
                None,
            )
            .unwrap();

        let missing = fx.saved(SiteRecord::new("Acme", "ghost"));
        let incomplete = fx.saved(SiteRecord::new("Acme", "no-css"));

        assert!(matches!(
            fx.renderer.generate(&missing),
            Err(SiteError::TemplateNotFound(id)) if id == "ghost"
        ));
        assert!(matches!(
            fx.renderer.generate(&incomplete),
            Err(SiteError::InvalidTemplate { missing: "stylesheet", .. })
        ));
    }

    #[test]
    fn unsaved_or_unusable_ids_never_touch_other_sites() {
        let fx = Fixture::new();
        let saved = fx.saved(SiteRecord::new("Acme", "t1"));
        let first = fx.renderer.generate(&saved).unwrap();

        for id in ["", ".", "..", "../escape"] {
            let mut ghost = SiteRecord::new("Ghost", "t1");
            ghost.id = id.to_string();

            let result = fx.renderer.generate(&ghost);

            assert!(matches!(result, Err(SiteError::RecordNotFound(_))), "{id:?} accepted");
        }

        assert_eq!(
            fs::read_to_string(first.output_dir.join(SITE_INDEX_FILE)).unwrap(),
            "<h1>Acme</h1>"
        );
        assert_eq!(file_names(&fx.layout.sites_dir), vec![saved.id.clone()]);
        assert!(file_names(&fx.layout.staging_dir).is_empty());
        assert!(fx.sites.is_empty());
    }

    #[test]
    fn generation_holds_the_record_lease() {
        let fx = Fixture::new();
        let record = fx.saved(SiteRecord::new("Acme", "t1"));

        let lease = fx.sites.lease(&record.id);
        let reader = lease.read();
        assert!(lease.try_write().is_none());
        drop(reader);

        fx.renderer.generate(&record).unwrap();
        assert!(lease.try_write().is_some());
        drop(lease);
        assert!(fx.sites.is_empty());
        assert!(fx.temp.path().join("sites").join(&record.id).is_dir());
    }
}
