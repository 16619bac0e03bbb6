//! Site creation, download and preview endpoints.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use sitewright_static::{Contact, SiteRecord, SocialAccount};

use crate::error::ApiError;
use crate::form::UploadForm;
use crate::state::AppState;

/// Most images accepted with a site request.
const MAX_SITE_IMAGES: usize = 5;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/create-site", post(create_site))
        .route("/download/{id}", get(download_site))
        .route("/preview/{id}", get(preview_site))
}

/// Store the images, save the record, then generate its site.
async fn create_site(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let images = form.take_files("images", MAX_SITE_IMAGES)?;

    let mut record = SiteRecord::new(form.required("name")?, form.required("templateId")?);
    record.site_type = form.text("siteType").unwrap_or_default().to_string();
    record.about = form.text("about").unwrap_or_default().to_string();
    record.description = form.text("description").unwrap_or_default().to_string();
    record.address = form.text("address").unwrap_or_default().to_string();
    record.website = form.text("website").unwrap_or_default().to_string();
    record.services = form.json::<Vec<String>>("services")?;
    record.contact = form.json::<Contact>("contact")?;
    record.social_accounts = form.json::<Vec<SocialAccount>>("socialAccounts")?;

    let (id, generated) = state
        .run(move |state| {
            for image in &images {
                let stored = state.uploads.store(&image.name, &image.bytes).map_err(|e| {
                    ApiError::Internal(format!("Failed to store upload {}: {e}", image.name))
                })?;
                record.images.push(stored);
            }

            let id = state.records.save(record)?;
            let record = state.records.find_by_id(&id)?;
            let generated = state.renderer.generate(&record)?;
            Ok((id, generated))
        })
        .await?;

    tracing::info!(
        "Created site {} at {} in {}ms",
        id,
        generated.location,
        generated.duration_ms
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Website generated successfully!",
            "websiteId": id,
        })),
    ))
}

/// Stream the generated site as a zip attachment.
async fn download_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let packed = state
        .run(move |state| {
            let record = state.records.find_by_id(&id)?;
            Ok(state.packager.pack(&record)?)
        })
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", packed.download_name);
    let size = packed.size;
    let stream = packed
        .into_stream()
        .map_err(|e| ApiError::Internal(format!("Failed to read archive: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, size.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

async fn preview_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let url = state
        .run(move |state| {
            let record = state.records.find_by_id(&id)?;
            Ok(state.preview.resolve(&record)?)
        })
        .await?;

    Ok(Json(json!({ "previewURL": url })))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use axum::http::Request;
    use http_body_util::BodyExt;
    use sitewright_store::UploadedFile;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;
    use zip::ZipArchive;

    use crate::server::{router, ServerConfig};
    use crate::state::StoragePaths;

    use super::*;

    const BOUNDARY: &str = "sitewright-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                Part::File(name, file_name, content_type, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn post_form(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn app() -> (TempDir, AppState, Router) {
        let temp = tempdir().unwrap();
        let config = ServerConfig {
            paths: StoragePaths::under(temp.path()),
            ..ServerConfig::default()
        };
        let state = AppState::open(&config.paths, "http://localhost:5000").unwrap();
        state
            .templates
            .put_direct(
                Some("t1"),
                &[
                    UploadedFile::new("index.ejs", None, "<h1><%=name%></h1>"),
                    UploadedFile::new("style.css", Some("text/css"), "h1 {}"),
                ],
                Some("Business"),
            )
            .unwrap();
        let app = router(state.clone(), &config);
        (temp, state, app)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(app: &Router, parts: &[Part<'_>]) -> Response {
        app.clone()
            .oneshot(post_form("/api/create-site", parts))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_preview_and_download_round_trip() {
        let (_temp, state, app) = app();

        let response = create(
            &app,
            &[
                Part::Text("name", "Acme"),
                Part::Text("templateId", "t1"),
                Part::Text("services", r#"["Repairs"]"#),
                Part::Text("contact", r#"{"phone":"555-0100"}"#),
                Part::File("images", "logo.png", "image/png", b"png"),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        let id = body["websiteId"].as_str().unwrap().to_string();

        let record = state.records.find_by_id(&id).unwrap();
        assert_eq!(record.services, vec!["Repairs".to_string()]);
        assert_eq!(record.images.len(), 1);
        assert_eq!(record.output_location(), Some(format!("/public/sites/{id}").as_str()));

        let response = app
            .clone()
            .oneshot(Request::get(format!("/api/preview/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["previewURL"],
            format!("http://localhost:5000/public/sites/{id}/index.html")
        );

        let response = app
            .clone()
            .oneshot(Request::get(format!("/api/download/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"website_Acme.zip\""
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        assert_eq!(archive.len(), 3);

        let response = app
            .oneshot(
                Request::get(format!("/public/sites/{id}/index.html"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&html[..], b"<h1>Acme</h1>");
    }

    #[tokio::test]
    async fn unknown_template_is_not_found() {
        let (_temp, _state, app) = app();

        let response = create(
            &app,
            &[Part::Text("name", "Acme"), Part::Text("templateId", "nope")],
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_name_is_rejected() {
        let (_temp, _state, app) = app();

        let response = create(&app, &[Part::Text("templateId", "t1")]).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["message"],
            "Missing required field: name"
        );
    }

    #[tokio::test]
    async fn malformed_services_are_rejected() {
        let (_temp, _state, app) = app();

        let response = create(
            &app,
            &[
                Part::Text("name", "Acme"),
                Part::Text("templateId", "t1"),
                Part::Text("services", "not json"),
            ],
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn preview_and_download_of_unknown_record_are_not_found() {
        let (_temp, _state, app) = app();
        let id = "0b7c3a9e-5d1f-4c2a-9e8b-1f2d3c4b5a69";

        for uri in [format!("/api/preview/{id}"), format!("/api/download/{id}")] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn ungenerated_record_has_no_preview() {
        let (_temp, state, app) = app();
        let id = state.records.save(SiteRecord::new("Acme", "t1")).unwrap();

        let response = app
            .oneshot(Request::get(format!("/api/preview/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_upload_list_update_delete() {
        let (_temp, _state, app) = app();

        let response = app
            .clone()
            .oneshot(post_form(
                "/api/admin/upload-files",
                &[
                    Part::Text("siteType", "Portfolio"),
                    Part::File("files", "page.html", "text/html", b"<p></p>"),
                    Part::File("files", "main.css", "text/css", b"p {}"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], "temp1");

        let response = app
            .clone()
            .oneshot(post_form(
                "/api/admin/update-files/temp1",
                &[Part::File("files", "notes.pdf", "application/pdf", b"%PDF")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(Request::get("/api/admin/templates").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        let ids: Vec<&str> = body["templates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["t1", "temp1"]);
        assert_eq!(body["templates"][1]["category"], "Portfolio");
        assert_eq!(body["templates"][1]["eligible"], true);

        let response = app
            .clone()
            .oneshot(
                Request::delete("/api/admin/templates/temp1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::delete("/api/admin/templates/temp1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_folder_name_conflicts() {
        let (_temp, _state, app) = app();

        let response = app
            .oneshot(post_form(
                "/api/admin/upload-files",
                &[
                    Part::Text("folderName", "t1"),
                    Part::File("files", "index.ejs", "application/octet-stream", b"<p></p>"),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn archive_upload_without_name_gets_generated_id() {
        let (_temp, state, app) = app();
        let archive = {
            let mut bytes = Vec::new();
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut bytes));
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("site/index.ejs", options).unwrap();
            std::io::Write::write_all(&mut zip, b"<p><%=name%></p>").unwrap();
            zip.start_file("site/style.css", options).unwrap();
            std::io::Write::write_all(&mut zip, b"p {}").unwrap();
            zip.finish().unwrap();
            bytes
        };

        let response = app
            .oneshot(post_form(
                "/api/admin/upload-template",
                &[Part::File("templateZip", "site.zip", "application/zip", &archive)],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], "temp1");
        assert!(state.templates.snapshot("temp1").is_ok());
    }

    #[tokio::test]
    async fn archive_upload_requires_a_file() {
        let (_temp, _state, app) = app();

        let response = app
            .oneshot(post_form(
                "/api/admin/upload-template",
                &[Part::Text("folderName", "x")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
