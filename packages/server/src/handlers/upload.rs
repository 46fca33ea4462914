use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::{Json, response::IntoResponse};
use media::IncomingFile;
use tracing::instrument;

use crate::config::UploadConfig;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::upload::UploadResponse;
use crate::state::AppState;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

pub fn upload_body_limit(config: &UploadConfig) -> DefaultBodyLimit {
    DefaultBodyLimit::max(config.body_limit())
}

/// Declared MIME type, else a guess from the file name, else octet-stream.
fn resolve_content_type(declared: Option<&str>, file_name: &str) -> String {
    declared
        .map(str::trim)
        .filter(|ct| !ct.is_empty() && *ct != FALLBACK_CONTENT_TYPE)
        .map(str::to_ascii_lowercase)
        .or_else(|| {
            mime_guess::from_path(file_name)
                .first()
                .map(|m| m.essence_str().to_string())
        })
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the upload limit".into())
    } else {
        AppError::Validation(format!("Multipart error: {}", e.body_text()))
    }
}

async fn read_file(field: Field<'_>) -> Result<IncomingFile, AppError> {
    let original_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = resolve_content_type(field.content_type(), &original_name);
    let data = field.bytes().await.map_err(multipart_error)?;

    Ok(IncomingFile {
        original_name,
        content_type,
        data: data.to_vec(),
    })
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Upload",
    operation_id = "uploadMedia",
    summary = "Upload an image or video",
    description = "Accepts one file in the `file` multipart field. Images (JPEG, PNG, GIF) up to 10 MiB \
        are stored as-is; videos (MP4, MOV, AVI, WebM) up to 100 MiB are transcoded to 720p H.264/AAC MP4 \
        first. The returned `mediaUrl` and `mediaType` are used to create a post.",
    request_body(content_type = "multipart/form-data", description = "The `file` field"),
    responses(
        (status = 200, description = "Media stored", body = UploadResponse),
        (status = 400, description = "No file uploaded (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 415, description = "File type not allowed (UNSUPPORTED_MEDIA_TYPE)", body = ErrorBody),
        (status = 500, description = "Storage not configured or processing failed (CONFIGURATION_ERROR, MEDIA_PROCESSING_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = %auth_user.user_id))]
pub async fn upload_media(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<IncomingFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") && file.is_none() {
            file = Some(read_file(field).await?);
        }
        // Other fields are ignored.
    }

    // Ingest on its own task: a dropped connection must not cancel a
    // transcode or store write midway.
    let uploads = state.uploads.clone();
    let uploaded = tokio::spawn(async move { uploads.ingest(file).await })
        .await
        .map_err(|e| AppError::Internal(format!("Upload task failed: {e}")))??;
    Ok(Json(UploadResponse::from(uploaded)))
}
