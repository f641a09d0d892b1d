use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::routes::{api_error, ApiError};
use crate::upload::{self, ImageFile, UploadError, UploadedImage};
use crate::AppState;

/// Multipart requests carry several images; each is capped separately.
pub const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub urls: Vec<String>,
}

/// Multi-file upload that stopped early. `uploaded` holds the URLs that
/// were stored before the failing file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFailureResponse {
    pub error: String,
    pub message: String,
    pub failed: String,
    pub uploaded: Vec<String>,
}

fn upload_status(error: &UploadError) -> StatusCode {
    match error {
        UploadError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// Every part that carries a filename, in request order.
async fn read_files(multipart: &mut Multipart) -> Result<Vec<ImageFile>, ApiError> {
    let mut files = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Multipart error: {}", e);
                return Err(api_error(StatusCode::BAD_REQUEST, "Invalid multipart data", None));
            }
        };

        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read upload bytes: {}", e);
            api_error(StatusCode::BAD_REQUEST, "Failed to read file data", None)
        })?;
        files.push(ImageFile::new(name, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No file provided", None));
    }
    Ok(files)
}

/// POST /api/admin/uploads
pub async fn upload_images(State(state): State<AppState>, mut multipart: Multipart) -> impl IntoResponse {
    let files = match read_files(&mut multipart).await {
        Ok(files) => files,
        Err(e) => return e.into_response(),
    };

    match upload::upload_images(&state.client, &state.config.image_bucket, &files, |_| {}).await {
        Ok(urls) => (StatusCode::CREATED, Json(UploadResponse { urls })).into_response(),
        Err(failure) => (
            upload_status(&failure.error),
            Json(UploadFailureResponse {
                error: failure.to_string(),
                message: failure.error.to_string(),
                failed: failure.failed,
                uploaded: failure.uploaded,
            }),
        )
            .into_response(),
    }
}

/// POST /api/admin/uploads/thumbnail
/// Only the first file is used.
pub async fn upload_thumbnail(State(state): State<AppState>, mut multipart: Multipart) -> impl IntoResponse {
    let file = match read_files(&mut multipart).await {
        Ok(mut files) => files.swap_remove(0),
        Err(e) => return e.into_response(),
    };

    match upload::upload_thumbnail(&state.client, &state.config.image_bucket, &file).await {
        Ok(image) => (StatusCode::CREATED, Json::<UploadedImage>(image)).into_response(),
        Err(e) => api_error(upload_status(&e), e.to_string(), None).into_response(),
    }
}
