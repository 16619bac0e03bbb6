//! Zip packaging of generated sites.
//!
//! Archives are written to a named temporary file and handed out as a
//! [`PackedSite`]. The temporary file is deleted when the `PackedSite`, or
//! the [`ArchiveStream`] made from it, is dropped, so every exit path
//! (finished download, aborted transfer, packing error) cleans up.

use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use sitewright_store::KeyedLocks;
use tempfile::{NamedTempFile, TempPath};
use tokio_util::io::ReaderStream;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::SiteError;
use crate::layout::SiteLayout;
use crate::record::SiteRecord;

/// Packs generated site directories into zip archives.
pub struct SitePackager {
    layout: SiteLayout,
    sites: Arc<KeyedLocks>,
    temp_dir: PathBuf,
}

/// A finished archive backed by a temporary file.
#[derive(Debug)]
pub struct PackedSite {
    file: NamedTempFile,

    /// Suggested filename for the download
    pub download_name: String,

    /// Number of files in the archive
    pub entries: usize,

    /// Archive size in bytes
    pub size: u64,
}

impl SitePackager {
    /// Create a packager writing temporary archives into `temp_dir`.
    pub fn new(
        layout: SiteLayout,
        sites: Arc<KeyedLocks>,
        temp_dir: impl Into<PathBuf>,
    ) -> Result<Self, SiteError> {
        let temp_dir = temp_dir.into();
        fs::create_dir_all(&temp_dir).map_err(|e| SiteError::io(&temp_dir, e))?;

        Ok(Self {
            layout,
            sites,
            temp_dir,
        })
    }

    /// Zip a record's generated site.
    pub fn pack(&self, record: &SiteRecord) -> Result<PackedSite, SiteError> {
        let not_generated = || SiteError::NotGenerated(record.id.clone());

        let location = record.output_location().ok_or_else(not_generated)?;
        let site_dir = self
            .layout
            .dir_for_location(location)
            .ok_or_else(not_generated)?;

        // Keep regeneration from swapping the directory mid-walk.
        let lease = self.sites.lease(&record.id);
        let _guard = lease.read();

        if !site_dir.is_dir() {
            return Err(not_generated());
        }

        let mut file = tempfile::Builder::new()
            .prefix("website_")
            .suffix(".zip")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| SiteError::io(&self.temp_dir, e))?;

        let entries = write_archive(&site_dir, file.as_file_mut())?;
        let size = file
            .as_file()
            .metadata()
            .map_err(|e| SiteError::io(file.path(), e))?
            .len();

        tracing::info!(
            "Packed site {} ({} files, {} bytes)",
            record.id,
            entries,
            size
        );

        Ok(PackedSite {
            file,
            download_name: download_name(&record.name),
            entries,
            size,
        })
    }
}

impl PackedSite {
    /// Location of the temporary archive.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Copy the archive into `writer`, then delete it.
    pub fn copy_to(mut self, writer: &mut impl Write) -> io::Result<u64> {
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(0))?;
        io::copy(file, writer)
    }

    /// Turn the archive into a byte stream. The temporary file lives exactly
    /// as long as the stream.
    pub fn into_stream(self) -> io::Result<ArchiveStream> {
        let (mut file, temp) = self.file.into_parts();
        file.seek(SeekFrom::Start(0))?;

        Ok(ArchiveStream {
            inner: ReaderStream::new(tokio::fs::File::from_std(file)),
            _temp: temp,
        })
    }
}

/// Chunked archive contents; deletes the temporary file when dropped.
pub struct ArchiveStream {
    inner: ReaderStream<tokio::fs::File>,
    _temp: TempPath,
}

impl Stream for ArchiveStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Write every file under `dir` into a zip, paths relative to `dir`.
fn write_archive(dir: &Path, out: &mut File) -> Result<usize, SiteError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    let mut zip = ZipWriter::new(out);
    let mut count = 0;

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| SiteError::Package(e.to_string()))?;
        let path = entry.path();
        let name = archive_name(dir, path)?;

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)
                .map_err(|e| SiteError::Package(e.to_string()))?;
            continue;
        }

        zip.start_file(name, options)
            .map_err(|e| SiteError::Package(e.to_string()))?;
        let mut source = File::open(path).map_err(|e| SiteError::io(path, e))?;
        io::copy(&mut source, &mut zip).map_err(|e| SiteError::io(path, e))?;
        count += 1;
    }

    zip.finish().map_err(|e| SiteError::Package(e.to_string()))?;
    Ok(count)
}

fn archive_name(root: &Path, path: &Path) -> Result<String, SiteError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| SiteError::Package(e.to_string()))?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// `website_<name>.zip`, keeping only ASCII filename-safe characters.
fn download_name(site_name: &str) -> String {
    let safe: String = site_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if safe.is_empty() {
        "website.zip".to_string()
    } else {
        format!("website_{safe}.zip")
    }
}
