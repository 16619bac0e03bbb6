//! Persistence for content records.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::error::SiteError;
use crate::record::SiteRecord;

/// Errors raised by a record store.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Corrupt record {}: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    #[error("I/O failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<RecordError> for SiteError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::NotFound(id) => SiteError::RecordNotFound(id),
            other => SiteError::Records(other.to_string()),
        }
    }
}

/// Document store for content records, keyed by generated id.
pub trait RecordStore: Send + Sync {
    /// Persist a record, assigning an id if it has none. Returns the id.
    fn save(&self, record: SiteRecord) -> Result<String, RecordError>;

    /// Load a record by id.
    fn find_by_id(&self, id: &str) -> Result<SiteRecord, RecordError>;

    /// Point a record at its generated output, replacing any previous value.
    fn update_output_location(&self, id: &str, location: &str) -> Result<(), RecordError>;
}

/// Record store keeping one JSON document per record in a directory.
#[derive(Debug)]
pub struct JsonRecordStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonRecordStore {
    /// Open a store, creating its directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| RecordError::Io {
            path: dir.clone(),
            source,
        })?;

        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    /// Path of the document for `id`. Ids that are not UUIDs cannot exist.
    fn path_for(&self, id: &str) -> Result<(String, PathBuf), RecordError> {
        let uuid = Uuid::parse_str(id).map_err(|_| RecordError::NotFound(id.to_string()))?;
        let id = uuid.to_string();
        let path = self.dir.join(format!("{id}.json"));
        Ok((id, path))
    }

    fn read(&self, id: &str, path: &Path) -> Result<SiteRecord, RecordError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RecordError::NotFound(id.to_string()));
            }
            Err(source) => {
                return Err(RecordError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|e| RecordError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write via a sibling temp file so readers never see a torn document.
    fn write(&self, path: &Path, record: &SiteRecord) -> Result<(), RecordError> {
        let json = serde_json::to_string_pretty(record).map_err(|e| RecordError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, path))
            .map_err(|source| RecordError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl RecordStore for JsonRecordStore {
    fn save(&self, mut record: SiteRecord) -> Result<String, RecordError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let (id, path) = self.path_for(&record.id)?;
        record.id = id.clone();

        self.write(&path, &record)?;

        tracing::debug!("Saved record {}", id);
        Ok(id)
    }

    fn find_by_id(&self, id: &str) -> Result<SiteRecord, RecordError> {
        let (id, path) = self.path_for(id)?;
        self.read(&id, &path)
    }

    fn update_output_location(&self, id: &str, location: &str) -> Result<(), RecordError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (id, path) = self.path_for(id)?;
        let mut record = self.read(&id, &path)?;
        record.site_path = Some(location.to_string());

        self.write(&path, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_assigns_id_and_round_trips() {
        let temp = tempdir().unwrap();
        let store = JsonRecordStore::open(temp.path()).unwrap();
        let mut record = SiteRecord::new("Acme", "t1");
        record.services = vec!["Catering".to_string(), "Delivery".to_string()];

        let id = store.save(record).unwrap();
        let loaded = store.find_by_id(&id).unwrap();

        assert_eq!(loaded.id, id);
        assert_eq!(loaded.services, vec!["Catering", "Delivery"]);
        assert_eq!(loaded.site_path, None);
    }

    #[test]
    fn output_location_is_overwritten() {
        let temp = tempdir().unwrap();
        let store = JsonRecordStore::open(temp.path()).unwrap();
        let id = store.save(SiteRecord::new("Acme", "t1")).unwrap();

        store.update_output_location(&id, "/public/sites/old").unwrap();
        store.update_output_location(&id, "/public/sites/new").unwrap();

        let loaded = store.find_by_id(&id).unwrap();
        assert_eq!(loaded.output_location(), Some("/public/sites/new"));
    }

    #[test]
    fn unknown_and_malformed_ids_are_not_found() {
        let temp = tempdir().unwrap();
        let store = JsonRecordStore::open(temp.path()).unwrap();

        let missing = Uuid::new_v4().to_string();
        assert!(matches!(store.find_by_id(&missing), Err(RecordError::NotFound(_))));
        assert!(matches!(
            store.find_by_id("../../etc/passwd"),
            Err(RecordError::NotFound(_))
        ));
        assert!(matches!(
            store.update_output_location(&missing, "/x"),
            Err(RecordError::NotFound(_))
        ));
    }
}
