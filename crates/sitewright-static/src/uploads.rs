//! Shared upload area for site images.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use sitewright_store::files::{base_name, is_plain_name};

/// Read access to uploaded files, by stored filename.
pub trait UploadArea: Send + Sync {
    /// Contents of an uploaded file. Missing files fail with
    /// [`io::ErrorKind::NotFound`].
    fn resolve(&self, filename: &str) -> io::Result<Vec<u8>>;
}

/// Upload area backed by a flat directory.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    /// Open an upload directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an incoming file as `<millis>-<basename>` and return the stored
    /// name. Never overwrites an existing upload.
    pub fn store(&self, original_name: &str, bytes: &[u8]) -> io::Result<String> {
        let base = base_name(original_name);
        let base = if is_plain_name(base) { base } else { "upload" };
        let mut stamp = Utc::now().timestamp_millis();

        loop {
            let name = format!("{stamp}-{base}");
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.root.join(&name))
            {
                Ok(mut file) => {
                    file.write_all(bytes)?;
                    tracing::debug!("Stored upload {}", name);
                    return Ok(name);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => stamp += 1,
                Err(e) => return Err(e),
            }
        }
    }
}

impl UploadArea for UploadDir {
    fn resolve(&self, filename: &str) -> io::Result<Vec<u8>> {
        if !is_plain_name(filename) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not an upload name: {filename}"),
            ));
        }
        fs::read(self.root.join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn stores_with_unique_prefixed_names() {
        let temp = tempdir().unwrap();
        let uploads = UploadDir::open(temp.path()).unwrap();

        let first = uploads.store("photos/storefront.jpg", b"one").unwrap();
        let second = uploads.store("storefront.jpg", b"two").unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with("-storefront.jpg"));
        assert_eq!(uploads.resolve(&first).unwrap(), b"one");
        assert_eq!(uploads.resolve(&second).unwrap(), b"two");
    }

    #[test]
    fn resolve_refuses_paths() {
        let temp = tempdir().unwrap();
        let uploads = UploadDir::open(temp.path().join("uploads")).unwrap();
        fs::write(temp.path().join("secret.txt"), "nope").unwrap();

        let err = uploads.resolve("../secret.txt").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let err = uploads.resolve("missing.png").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
