//! Canonical slot file names and classification of uploaded files.

use crate::error::StoreError;

/// Markup template file inside a slot.
pub const MARKUP_FILE: &str = "index.ejs";

/// Stylesheet file inside a slot.
pub const STYLESHEET_FILE: &str = "style.css";

/// Preview image file inside a slot.
pub const PREVIEW_FILE: &str = "template.png";

/// Metadata file inside a slot.
pub const METADATA_FILE: &str = "metadata.json";

/// A file handed to the store by a caller.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original filename as sent by the client
    pub name: String,

    /// Declared content type, if any
    pub content_type: Option<String>,

    /// File contents
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content_type: Option<&str>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.map(str::to_string),
            bytes: bytes.into(),
        }
    }

    fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }

    fn extension(&self) -> String {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// What an uploaded file is for, once recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Markup,
    Stylesheet,
    Preview,
}

impl FileRole {
    /// Canonical filename for this role.
    pub fn file_name(self) -> &'static str {
        match self {
            FileRole::Markup => MARKUP_FILE,
            FileRole::Stylesheet => STYLESHEET_FILE,
            FileRole::Preview => PREVIEW_FILE,
        }
    }

    /// Classify a file for a new slot: images by content type, the rest by
    /// extension or content type.
    pub fn for_new_slot(file: &UploadedFile) -> Option<Self> {
        if file.is_image() {
            return Some(FileRole::Preview);
        }

        let content_type = file.content_type.as_deref().unwrap_or("");
        match file.extension().as_str() {
            "ejs" | "html" | "htm" => Some(FileRole::Markup),
            "css" => Some(FileRole::Stylesheet),
            _ if content_type.starts_with("text/css") => Some(FileRole::Stylesheet),
            _ if content_type.starts_with("text/html") => Some(FileRole::Markup),
            _ => None,
        }
    }

    /// Classify a replacement file: markup and stylesheet only by exact
    /// canonical name, images by content type.
    pub fn for_update(file: &UploadedFile) -> Option<Self> {
        match file.name.as_str() {
            MARKUP_FILE => Some(FileRole::Markup),
            STYLESHEET_FILE => Some(FileRole::Stylesheet),
            _ if file.is_image() => Some(FileRole::Preview),
            _ => None,
        }
    }
}

/// Check that `id` names a single directory inside the store root.
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    if is_plain_name(id) {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

/// Whether `name` is usable as a single path segment.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Final path segment of a client-supplied filename.
pub fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}
