//! Mapping of pipeline errors onto HTTP responses.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sitewright_static::{RecordError, SiteError};
use sitewright_store::StoreError;

/// Error returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Site(#[from] SiteError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        ApiError::Site(err.into())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl ApiError {
    /// Status code reported for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(err) => store_status(err),
            ApiError::Site(err) => match err {
                SiteError::TemplateNotFound(_)
                | SiteError::RecordNotFound(_)
                | SiteError::NotGenerated(_) => StatusCode::NOT_FOUND,
                SiteError::InvalidTemplate { .. } => StatusCode::BAD_REQUEST,
                SiteError::ImageNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SiteError::Store(err) => store_status(err),
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::InvalidTemplate { .. }
        | StoreError::NoValidFiles
        | StoreError::InvalidId(_)
        | StoreError::InvalidArchive(_) => StatusCode::BAD_REQUEST,
        StoreError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}: {}", status, self);
        }

        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
