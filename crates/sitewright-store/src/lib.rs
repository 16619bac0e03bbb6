//! Template slot storage for sitewright.
//!
//! A template slot is a directory holding one template's markup, stylesheet,
//! optional preview image and metadata. This crate owns those directories:
//! it lists, creates, updates and deletes slots, and normalizes uploaded
//! archives into a flat slot layout.

pub mod archive;
pub mod error;
pub mod files;
pub mod locks;
pub mod store;

pub use archive::{plan_extraction, plan_extraction_within, ExtractionPlan, PlannedFile, MAX_EXTRACTED_BYTES};
pub use error::StoreError;
pub use files::{FileRole, UploadedFile, MARKUP_FILE, METADATA_FILE, PREVIEW_FILE, STYLESHEET_FILE};
pub use locks::KeyedLocks;
pub use store::{SlotUpload, TemplateMetadata, TemplateSnapshot, TemplateStore, TemplateSummary};
