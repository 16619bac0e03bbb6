//! Template administration endpoints.

use axum::extract::{Multipart, Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::form::UploadForm;
use crate::state::AppState;

/// Most discrete files accepted when creating a slot.
const MAX_SLOT_FILES: usize = 10;

/// Most files accepted when replacing slot files.
const MAX_UPDATE_FILES: usize = 2;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/templates", get(list_templates))
        .route("/templates/{name}", delete(delete_template))
        .route("/upload-files", post(upload_files))
        .route("/update-files/{name}", post(update_files))
        .route("/upload-template", post(upload_template))
}

async fn list_templates(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let templates = state.run(|state| Ok(state.templates.list()?)).await?;
    Ok(Json(json!({ "templates": templates })))
}

async fn delete_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = name.clone();
    state.run(move |state| Ok(state.templates.delete(&id)?)).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Template {name} deleted"),
    })))
}

async fn upload_files(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let files = form.take_files("files", MAX_SLOT_FILES)?;
    let folder = form.text("folderName").map(str::to_string);
    let category = form.text("siteType").map(str::to_string);

    let upload = state
        .run(move |state| {
            Ok(state
                .templates
                .put_direct(folder.as_deref(), &files, category.as_deref())?)
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Uploaded {} files to {}", upload.files, upload.id),
        "id": upload.id,
    })))
}

async fn update_files(
    State(state): State<AppState>,
    Path(name): Path<String>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let files = form.take_files("files", MAX_UPDATE_FILES)?;

    let id = name.clone();
    let updated = state
        .run(move |state| Ok(state.templates.update_files(&id, &files)?))
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Updated {updated} files in {name}"),
    })))
}

async fn upload_template(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let archive = form
        .take_files("templateZip", 1)?
        .pop()
        .ok_or_else(|| ApiError::BadRequest("No template archive uploaded".to_string()))?;
    let folder = form.text("folderName").map(str::to_string);
    let category = form.text("siteType").map(str::to_string);

    let upload = state
        .run(move |state| {
            Ok(state.templates.put_archive(
                folder.as_deref(),
                &archive.bytes,
                category.as_deref(),
            )?)
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Extracted {} files into {}", upload.files, upload.id),
        "id": upload.id,
    })))
}
