//! Normalization of uploaded template archives.
//!
//! Template archives arrive in whatever shape the author zipped them: files
//! at the root, wrapped in a folder, or buried one level deeper. Extraction
//! tries two rules in order and stops at the first that finds anything:
//!
//! 1. **Root files**: every file entry without a `/` in its path.
//! 2. **Nested flatten**: pick the first top-level folder `L1` and the first
//!    folder `L2` directly inside it. Every file under `L1/` or `L1/L2/`
//!    (at any depth) is kept under its basename only.
//!
//! Folder choice is lexicographic so the result does not depend on the order
//! in which an archiver wrote its entries. Flattening drops directory
//! structure, so two files with the same basename overwrite each other in
//! archive order.

use std::collections::BTreeSet;
use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::StoreError;
use crate::files::{base_name, is_plain_name};

/// Resource-fork folder added by macOS archivers.
const MACOS_METADATA_DIR: &str = "__MACOSX";

/// Most bytes an archive may expand to across all selected files.
pub const MAX_EXTRACTED_BYTES: u64 = 256 * 1024 * 1024;

/// Which extraction rule produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionRule {
    RootFiles,
    NestedFlatten,
}

/// A file selected for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    /// Path inside the archive
    pub source: String,

    /// Filename inside the target slot
    pub dest: String,

    /// Decompressed contents
    pub bytes: Vec<u8>,
}

/// The files an archive yields, in archive order.
#[derive(Debug, Clone)]
pub struct ExtractionPlan {
    pub rule: ExtractionRule,
    pub files: Vec<PlannedFile>,
}

/// An archive entry as seen during planning.
#[derive(Debug)]
struct Entry {
    index: usize,
    path: String,
    is_dir: bool,
}

/// Decide which files of a zip archive belong in a template slot.
///
/// Fails with [`StoreError::NoValidFiles`] when neither rule selects a file.
pub fn plan_extraction(bytes: &[u8]) -> Result<ExtractionPlan, StoreError> {
    plan_extraction_within(bytes, MAX_EXTRACTED_BYTES)
}

/// [`plan_extraction`] with an explicit cap on the decompressed total.
///
/// Sizes declared in entry headers are not trusted; the cap is enforced on
/// the bytes actually produced.
pub fn plan_extraction_within(bytes: &[u8], limit: u64) -> Result<ExtractionPlan, StoreError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| StoreError::InvalidArchive(e.to_string()))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let file = archive
            .by_index_raw(index)
            .map_err(|e| StoreError::InvalidArchive(e.to_string()))?;
        entries.push(Entry {
            index,
            path: file.name().to_string(),
            is_dir: file.is_dir(),
        });
    }

    let (rule, selected) = match select_root_files(&entries) {
        root if !root.is_empty() => (ExtractionRule::RootFiles, root),
        _ => (ExtractionRule::NestedFlatten, select_nested_files(&entries)),
    };

    if selected.is_empty() {
        return Err(StoreError::NoValidFiles);
    }

    let mut remaining = limit;
    let mut files = Vec::with_capacity(selected.len());
    for (entry, dest) in selected {
        let mut file = archive
            .by_index(entry.index)
            .map_err(|e| StoreError::InvalidArchive(e.to_string()))?;

        let mut contents = Vec::new();
        file.by_ref()
            .take(remaining.saturating_add(1))
            .read_to_end(&mut contents)
            .map_err(|e| StoreError::InvalidArchive(format!("{}: {}", entry.path, e)))?;

        let produced = contents.len() as u64;
        if produced > remaining {
            return Err(StoreError::InvalidArchive(format!(
                "contents exceed {limit} bytes when extracted"
            )));
        }
        remaining -= produced;

        files.push(PlannedFile {
            source: entry.path.clone(),
            dest,
            bytes: contents,
        });
    }

    tracing::debug!("Archive plan: {:?} selected {} files", rule, files.len());

    Ok(ExtractionPlan { rule, files })
}

/// Rule 1: file entries at the archive root.
fn select_root_files(entries: &[Entry]) -> Vec<(&Entry, String)> {
    entries
        .iter()
        .filter(|e| !e.is_dir && !e.path.contains('/'))
        .filter_map(|e| accept(e, &e.path))
        .collect()
}

/// Rule 2: files under the first top-level folder and its first subfolder.
fn select_nested_files(entries: &[Entry]) -> Vec<(&Entry, String)> {
    let folders = folder_paths(entries);

    let Some(first) = folders
        .iter()
        .find(|f| !f.contains('/') && f.as_str() != MACOS_METADATA_DIR)
    else {
        return Vec::new();
    };

    let mut prefixes = vec![format!("{first}/")];
    if let Some(second) = folders.iter().find(|f| {
        f.strip_prefix(first.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
    }) {
        prefixes.push(format!("{second}/"));
    }

    entries
        .iter()
        .filter(|e| !e.is_dir)
        .filter(|e| prefixes.iter().any(|p| e.path.starts_with(p.as_str())))
        .filter_map(|e| accept(e, base_name(&e.path)))
        .collect()
}

/// Every folder in the archive, explicit or implied by a file path, sorted.
fn folder_paths(entries: &[Entry]) -> BTreeSet<String> {
    let mut folders = BTreeSet::new();

    for entry in entries {
        let path = entry.path.trim_end_matches('/');
        let mut segments: Vec<&str> = path.split('/').collect();
        if !entry.is_dir {
            segments.pop();
        }

        for depth in 1..=segments.len() {
            let folder = segments[..depth].join("/");
            if !folder.is_empty() {
                folders.insert(folder);
            }
        }
    }

    folders
}

fn accept<'a>(entry: &'a Entry, dest: &str) -> Option<(&'a Entry, String)> {
    if is_plain_name(dest) {
        Some((entry, dest.to_string()))
    } else {
        tracing::warn!("Skipping archive entry with unusable name: {}", entry.path);
        None
    }
}
