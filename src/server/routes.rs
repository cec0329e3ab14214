use crate::core::archive::ARCHIVE_FILE_NAME;
use crate::domain::ports::Storage;
use crate::server::AppState;
use crate::utils::error::BannerError;
use crate::utils::validation::sanitize_filename;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;

const UPLOAD_PAGE: &str = include_str!("../../templates/upload.html");
const UPLOAD_FIELD: &str = "file";

pub struct ApiError(BannerError);

impl From<BannerError> for ApiError {
    fn from(err: BannerError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(
                error = %self.0,
                category = ?self.0.category(),
                "Banner request failed"
            );
        } else {
            tracing::warn!(error = %self.0, "Banner request rejected");
        }

        (status, self.0.user_friendly_message()).into_response()
    }
}

pub async fn upload_page() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

/// Save the uploaded spreadsheet, run a batch over it and return the archive.
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(upload_error)?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) = upload.ok_or_else(|| BannerError::UploadError {
        message: "No file was uploaded".to_string(),
    })?;
    let safe_name = sanitize_filename(&file_name).ok_or_else(|| BannerError::UploadError {
        message: format!("'{}' is not a usable file name", file_name),
    })?;

    // Save, run and read back under one lock.
    let _guard = state.run_lock.lock().await;

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(BannerError::IoError)?;
    let path = state.upload_dir.join(&safe_name);
    tokio::fs::write(&path, &data)
        .await
        .map_err(BannerError::IoError)?;
    tracing::info!("Saved upload {} ({} bytes)", path.display(), data.len());

    let report = state.engine.run(&path).await?;
    tracing::info!(
        "Returning {} banners, {} domains skipped",
        report.entries.len(),
        report.skipped.len()
    );
    let archive = state.engine.storage().read_file(ARCHIVE_FILE_NAME).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", ARCHIVE_FILE_NAME),
            ),
        ],
        archive,
    )
        .into_response())
}

fn upload_error(err: axum::extract::multipart::MultipartError) -> BannerError {
    BannerError::UploadError {
        message: err.body_text(),
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
