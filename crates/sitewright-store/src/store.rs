//! Template slot store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::archive::plan_extraction;
use crate::error::StoreError;
use crate::files::{
    base_name, is_plain_name, validate_id, FileRole, UploadedFile, MARKUP_FILE, METADATA_FILE,
    PREVIEW_FILE, STYLESHEET_FILE,
};
use crate::locks::KeyedLocks;

/// Prefix of system-generated slot ids (`temp1`, `temp2`, ...).
pub const GENERATED_ID_PREFIX: &str = "temp";

/// Category used when a slot has no readable metadata.
pub const DEFAULT_CATEGORY: &str = "Unknown";

/// Contents of a slot's `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    /// Free-form category tag
    #[serde(alias = "siteType")]
    pub category: String,
}

impl Default for TemplateMetadata {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

/// A template as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub category: String,
    pub has_markup: bool,
    pub has_stylesheet: bool,
    pub has_preview: bool,
    /// Whether the slot can be used to generate a site
    pub eligible: bool,
}

/// Everything generation needs from a template, read in one go.
#[derive(Debug, Clone)]
pub struct TemplateSnapshot {
    pub id: String,
    pub category: String,
    pub markup: String,
    pub stylesheet: Vec<u8>,
}

/// Slot written by an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotUpload {
    pub id: String,
    pub files: usize,
}

/// Template store rooted at a directory of slots.
#[derive(Debug)]
pub struct TemplateStore {
    root: PathBuf,
    slots: KeyedLocks,
    /// Serializes id allocation with slot creation
    create: Mutex<()>,
    generated_id: Regex,
}

impl TemplateStore {
    /// Open a store, creating the root directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;

        let generated_id = Regex::new(&format!("^{GENERATED_ID_PREFIX}([0-9]+)$"))
            .map_err(|e| StoreError::io(&root, io::Error::other(e)))?;

        Ok(Self {
            root,
            slots: KeyedLocks::new(),
            create: Mutex::new(()),
            generated_id,
        })
    }

    /// Root directory holding the slots.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        validate_id(id)?;
        Ok(self.root.join(id))
    }

    fn existing_slot(&self, id: &str) -> Result<PathBuf, StoreError> {
        let path = self.slot_path(id)?;
        if path.is_dir() {
            Ok(path)
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }

    fn slot_names(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();

        Ok(names)
    }

    /// List every slot with its category and file presence.
    pub fn list(&self) -> Result<Vec<TemplateSummary>, StoreError> {
        let summaries = self
            .slot_names()?
            .into_iter()
            .map(|id| {
                let path = self.root.join(&id);
                let has_markup = path.join(MARKUP_FILE).is_file();
                let has_stylesheet = path.join(STYLESHEET_FILE).is_file();

                TemplateSummary {
                    category: read_metadata(&path).category,
                    has_markup,
                    has_stylesheet,
                    has_preview: path.join(PREVIEW_FILE).is_file(),
                    eligible: has_markup && has_stylesheet,
                    id,
                }
            })
            .collect();

        Ok(summaries)
    }

    /// Remove a slot and everything in it.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        validate_id(id)?;
        let lease = self.slots.lease(id);
        let _guard = lease.write();

        let path = self.existing_slot(id)?;
        fs::remove_dir_all(&path).map_err(|e| StoreError::io(&path, e))?;

        tracing::info!("Deleted template {}", id);
        Ok(())
    }

    /// Create an empty slot, failing if it already exists.
    fn create_slot(&self, id: &str) -> Result<PathBuf, StoreError> {
        let path = self.slot_path(id)?;
        match fs::create_dir(&path) {
            Ok(()) => Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::Conflict(id.to_string()))
            }
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Next system-generated id: one past the highest numeric suffix in use.
    pub fn next_generated_id(&self) -> Result<String, StoreError> {
        let highest = self
            .slot_names()?
            .iter()
            .filter_map(|name| self.generated_id.captures(name))
            .filter_map(|caps| caps[1].parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        Ok(format!("{GENERATED_ID_PREFIX}{}", highest + 1))
    }

    /// Create a new slot from discrete files.
    ///
    /// Without an explicit `id` the next system-generated id is used.
    /// Recognized files are stored under their canonical names; anything else
    /// keeps its original basename.
    pub fn put_direct(
        &self,
        id: Option<&str>,
        files: &[UploadedFile],
        category: Option<&str>,
    ) -> Result<SlotUpload, StoreError> {
        if files.is_empty() {
            return Err(StoreError::NoValidFiles);
        }

        let _create = self.create.lock().unwrap_or_else(PoisonError::into_inner);

        let id = match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self.next_generated_id()?,
        };
        validate_id(&id)?;

        let lease = self.slots.lease(&id);
        let _guard = lease.write();

        let path = self.create_slot(&id)?;

        let mut count = 0;
        for file in files {
            let name = match FileRole::for_new_slot(file) {
                Some(role) => role.file_name(),
                None => base_name(&file.name),
            };
            if !is_plain_name(name) || name == METADATA_FILE {
                tracing::warn!("Skipping upload with unusable name: {:?}", file.name);
                continue;
            }

            write_file(&path.join(name), &file.bytes)?;
            count += 1;
        }

        write_metadata(&path, category.unwrap_or(DEFAULT_CATEGORY))?;

        tracing::info!("Uploaded {} files to {}", count, id);
        Ok(SlotUpload { id, files: count })
    }

    /// Replace markup, stylesheet and/or preview image of an existing slot.
    ///
    /// Returns the number of files applied. Unrecognized files are ignored;
    /// if nothing is recognized the slot is left untouched.
    pub fn update_files(&self, id: &str, files: &[UploadedFile]) -> Result<usize, StoreError> {
        validate_id(id)?;
        let lease = self.slots.lease(id);
        let _guard = lease.write();

        let path = self.existing_slot(id)?;

        let recognized: Vec<(FileRole, &UploadedFile)> = files
            .iter()
            .filter_map(|f| FileRole::for_update(f).map(|role| (role, f)))
            .collect();

        if recognized.is_empty() {
            return Err(StoreError::NoValidFiles);
        }

        for (role, file) in &recognized {
            write_file(&path.join(role.file_name()), &file.bytes)?;
            tracing::debug!("Replaced {} in {}", role.file_name(), id);
        }

        tracing::info!("Updated {} files in {}", recognized.len(), id);
        Ok(recognized.len())
    }

    /// Extract an uploaded archive into a slot.
    ///
    /// With an explicit `target` the slot is created if needed and existing
    /// files of the same name are overwritten. Without one, a new slot with
    /// the next system-generated id is created. Files written before an I/O
    /// failure are not rolled back.
    pub fn put_archive(
        &self,
        target: Option<&str>,
        archive: &[u8],
        category: Option<&str>,
    ) -> Result<SlotUpload, StoreError> {
        let plan = plan_extraction(archive)?;

        let (id, path) = match target.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                let path = self.slot_path(id)?;
                (id.to_string(), path)
            }
            None => {
                let _create = self.create.lock().unwrap_or_else(PoisonError::into_inner);
                let id = self.next_generated_id()?;
                let path = self.create_slot(&id)?;
                (id, path)
            }
        };

        let lease = self.slots.lease(&id);
        let _guard = lease.write();

        fs::create_dir_all(&path).map_err(|e| StoreError::io(&path, e))?;
        for file in &plan.files {
            write_file(&path.join(&file.dest), &file.bytes)?;
        }

        if let Some(category) = category {
            write_metadata(&path, category)?;
        }

        tracing::info!(
            "Extracted {} files into {} ({:?})",
            plan.files.len(),
            id,
            plan.rule
        );
        Ok(SlotUpload {
            id,
            files: plan.files.len(),
        })
    }

    /// Read a generation-eligible template.
    pub fn snapshot(&self, id: &str) -> Result<TemplateSnapshot, StoreError> {
        validate_id(id)?;
        let lease = self.slots.lease(id);
        let _guard = lease.read();

        let path = self.existing_slot(id)?;

        let markup = read_required(&path.join(MARKUP_FILE), id, "markup")?;
        let markup = String::from_utf8(markup).map_err(|e| {
            StoreError::io(
                path.join(MARKUP_FILE),
                io::Error::new(io::ErrorKind::InvalidData, e),
            )
        })?;
        let stylesheet = read_required(&path.join(STYLESHEET_FILE), id, "stylesheet")?;

        Ok(TemplateSnapshot {
            id: id.to_string(),
            category: read_metadata(&path).category,
            markup,
            stylesheet,
        })
    }
}

fn read_required(path: &Path, id: &str, what: &'static str) -> Result<Vec<u8>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::InvalidTemplate {
            id: id.to_string(),
            missing: what,
        }),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

fn read_metadata(slot: &Path) -> TemplateMetadata {
    fs::read_to_string(slot.join(METADATA_FILE))
        .ok()
        .and_then(|raw| serde_json::from_str::<TemplateMetadata>(&raw).ok())
        .filter(|m| !m.category.is_empty())
        .unwrap_or_default()
}

fn write_metadata(slot: &Path, category: &str) -> Result<(), StoreError> {
    let metadata = TemplateMetadata {
        category: category.to_string(),
    };
    let path = slot.join(METADATA_FILE);
    let json = serde_json::to_string_pretty(&metadata)
        .map_err(|e| StoreError::io(&path, io::Error::other(e)))?;
    write_file(&path, json.as_bytes())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    fs::write(path, bytes).map_err(|e| StoreError::io(path, e))
}
