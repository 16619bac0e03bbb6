//! Collecting multipart forms into text fields and uploaded files.

use std::collections::HashMap;

use axum::extract::Multipart;
use serde::de::DeserializeOwned;
use sitewright_store::UploadedFile;

use crate::error::ApiError;

/// A fully read multipart form.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    fields: HashMap<String, String>,
    files: Vec<(String, UploadedFile)>,
}

impl UploadForm {
    /// Read every part of `multipart` into memory.
    pub(crate) async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let text = field.text().await?;
                form.fields.insert(name, text);
                continue;
            };

            let content_type = field
                .content_type()
                .filter(|ct| *ct != "application/octet-stream")
                .map(str::to_string)
                .or_else(|| {
                    mime_guess::from_path(&file_name)
                        .first()
                        .map(|m| m.essence_str().to_string())
                });
            let bytes = field.bytes().await?;

            // An empty file input still submits a nameless part.
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }

            tracing::debug!("Received {} ({} bytes) as {}", file_name, bytes.len(), name);
            form.files.push((
                name,
                UploadedFile::new(file_name, content_type.as_deref(), bytes.to_vec()),
            ));
        }

        Ok(form)
    }

    /// Trimmed, non-empty text field.
    pub(crate) fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub(crate) fn required(&self, key: &str) -> Result<&str, ApiError> {
        self.text(key)
            .ok_or_else(|| ApiError::BadRequest(format!("Missing required field: {key}")))
    }

    /// JSON-encoded field, or the type's default when absent.
    pub(crate) fn json<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, ApiError> {
        match self.text(key) {
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| ApiError::BadRequest(format!("Invalid {key}: {e}"))),
            None => Ok(T::default()),
        }
    }

    /// Take the files sent under `field`, rejecting more than `max`.
    pub(crate) fn take_files(&mut self, field: &str, max: usize) -> Result<Vec<UploadedFile>, ApiError> {
        let (taken, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition::<Vec<_>, _>(|(name, _)| name == field);
        self.files = rest;

        if taken.len() > max {
            return Err(ApiError::BadRequest(format!(
                "Too many files in {field}: at most {max} allowed"
            )));
        }
        Ok(taken.into_iter().map(|(_, file)| file).collect())
    }
}
