//! Site generation for sitewright.
//!
//! Renders a template slot against a content record into a static site
//! directory, packs generated sites into zip archives, and resolves preview
//! URLs.

pub mod error;
pub mod layout;
pub mod package;
pub mod preview;
pub mod record;
pub mod records;
pub mod renderer;
pub mod templates;
pub mod uploads;

pub use error::SiteError;
pub use layout::SiteLayout;
pub use package::{ArchiveStream, PackedSite, SitePackager};
pub use preview::PreviewResolver;
pub use record::{Contact, SiteRecord, SocialAccount};
pub use records::{JsonRecordStore, RecordError, RecordStore};
pub use renderer::{GenerateResult, SiteRenderer};
pub use templates::{TemplateEngine, STARTER_MARKUP, STARTER_STYLESHEET};
pub use uploads::{UploadArea, UploadDir};
