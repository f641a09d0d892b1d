//! Image uploads into the storage bucket.
//!
//! Each file gets a random name that keeps its extension, is checked against
//! the allowed image types and stored; the caller receives its public URL.

use rand::Rng;
use serde::Serialize;

use crate::backend::{BackendClient, BackendError};

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];
pub const THUMBNAIL_PREFIX: &str = "thumbnail-";

const NAME_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const NAME_RANDOM_LEN: usize = 13;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.")]
    UnsupportedType,

    #[error("File too large. Maximum size is 5MB.")]
    TooLarge,

    #[error("Empty file")]
    Empty,

    #[error("File content does not match an allowed image type.")]
    ContentMismatch,

    #[error("Failed to upload image")]
    Storage(#[from] BackendError),
}

/// Sequential upload stopped at `failed`; `uploaded` holds the URLs
/// produced before it.
#[derive(Debug, thiserror::Error)]
#[error("Failed to upload {failed}")]
pub struct UploadFailure {
    pub uploaded: Vec<String>,
    pub failed: String,
    #[source]
    pub error: UploadError,
}

#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lowercased text after the last dot, if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        (!ext.is_empty()).then(|| ext.to_lowercase())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub url: String,
    pub path: String,
    pub size: usize,
    pub mime_type: &'static str,
}

fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

/// Extension allow-list, size cap and content sniffing. Returns the MIME type.
pub fn check_image(file: &ImageFile) -> Result<&'static str, UploadError> {
    let ext = file.extension().unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(UploadError::UnsupportedType);
    }
    if file.bytes.len() > MAX_FILE_SIZE {
        return Err(UploadError::TooLarge);
    }
    if file.bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    validate_image_magic_bytes(&file.bytes).ok_or(UploadError::ContentMismatch)
}

/// `{13 random [a-z0-9]}{unix millis}[.ext]`
pub fn random_file_name(extension: Option<&str>) -> String {
    let mut rng = rand::rng();
    let random: String = (0..NAME_RANDOM_LEN)
        .map(|_| NAME_CHARSET[rng.random_range(0..NAME_CHARSET.len())] as char)
        .collect();
    let millis = chrono::Utc::now().timestamp_millis();

    match extension {
        Some(ext) => format!("{random}{millis}.{ext}"),
        None => format!("{random}{millis}"),
    }
}

async fn store(
    client: &BackendClient,
    bucket: &str,
    prefix: &str,
    file: &ImageFile,
) -> Result<UploadedImage, UploadError> {
    let mime_type = check_image(file)?;
    let path = format!("{prefix}{}", random_file_name(file.extension().as_deref()));

    client
        .storage()
        .upload(bucket, &path, &file.bytes, mime_type)
        .await
        .inspect_err(|e| tracing::error!(bucket = %bucket, file = %file.name, error = %e, "upload failed"))?;

    let url = client.storage().public_url(bucket, &path);
    tracing::info!("Image uploaded: {} ({} bytes)", path, file.bytes.len());

    Ok(UploadedImage {
        url,
        path,
        size: file.bytes.len(),
        mime_type,
    })
}

pub async fn upload_image(client: &BackendClient, bucket: &str, file: &ImageFile) -> Result<UploadedImage, UploadError> {
    store(client, bucket, "", file).await
}

pub async fn upload_thumbnail(
    client: &BackendClient,
    bucket: &str,
    file: &ImageFile,
) -> Result<UploadedImage, UploadError> {
    store(client, bucket, THUMBNAIL_PREFIX, file).await
}

/// Uploads one file at a time. `on_uploaded` sees each URL as soon as it
/// exists; the first failure stops the run and later files are not tried.
pub async fn upload_images<F>(
    client: &BackendClient,
    bucket: &str,
    files: &[ImageFile],
    mut on_uploaded: F,
) -> Result<Vec<String>, UploadFailure>
where
    F: FnMut(&str),
{
    let mut uploaded = Vec::with_capacity(files.len());
    for file in files {
        match upload_image(client, bucket, file).await {
            Ok(image) => {
                on_uploaded(&image.url);
                uploaded.push(image.url);
            }
            Err(error) => {
                tracing::warn!(
                    failed = %file.name,
                    kept = uploaded.len(),
                    "stopping multi-file upload"
                );
                return Err(UploadFailure {
                    uploaded,
                    failed: file.name.clone(),
                    error,
                });
            }
        }
    }
    Ok(uploaded)
}
