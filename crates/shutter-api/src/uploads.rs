use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// URL prefix the upload directory is served under.
pub const UPLOAD_ROUTE: &str = "/uploads";

/// 10 MB default upload limit for images
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A validated image taken from a multipart field.
pub struct ImageUpload {
    pub bytes: Bytes,
    pub extension: &'static str,
}

/// Local-disk storage for post images and profile pictures.
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn ensure_dir(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Writes the image as `{prefix}-{uuid}.{ext}` and returns its public
    /// path, e.g. `/uploads/post-<uuid>.png`.
    pub async fn save_image(&self, prefix: &str, image: &ImageUpload) -> ApiResult<String> {
        let file_name = format!("{}-{}.{}", prefix, Uuid::new_v4(), image.extension);
        let file_path = self.dir.join(&file_name);

        self.ensure_dir().await.map_err(|e| {
            error!("Failed to create uploads directory: {}", e);
            ApiError::Internal(e)
        })?;

        let mut file = tokio::fs::File::create(&file_path).await.map_err(|e| {
            error!("Failed to create file {}: {}", file_path.display(), e);
            ApiError::Internal(e.into())
        })?;
        file.write_all(&image.bytes).await.map_err(|e| {
            error!("Failed to write file {}: {}", file_path.display(), e);
            ApiError::Internal(e.into())
        })?;
        file.flush().await.map_err(|e| ApiError::Internal(e.into()))?;

        debug!("Stored upload {} ({} bytes)", file_name, image.bytes.len());
        Ok(format!("{UPLOAD_ROUTE}/{file_name}"))
    }

    /// Best-effort delete of a previously stored upload. Only the file name
    /// of `public_path` is used, so it cannot escape the upload directory.
    pub async fn remove(&self, public_path: &str) {
        if public_path.starts_with("http://") || public_path.starts_with("https://") {
            return;
        }
        let Some(file_name) = Path::new(public_path).file_name() else {
            return;
        };

        let file_path = self.dir.join(file_name);
        if let Err(e) = tokio::fs::remove_file(&file_path).await {
            warn!("Failed to remove upload {}: {}", file_path.display(), e);
        }
    }

    /// Reads an image field, enforcing the size limit and the accepted
    /// content types.
    pub async fn read_image(&self, field: Field<'_>) -> ApiResult<ImageUpload> {
        let extension = image_extension(field.content_type())
            .ok_or_else(|| ApiError::bad_request("Only image files (jpeg, png, webp, jpg) are allowed!"))?;

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("Uploaded image is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(ApiError::PayloadTooLarge);
        }

        Ok(ImageUpload { bytes, extension })
    }
}

/// File extension for an accepted image content type.
pub fn image_extension(content_type: Option<&str>) -> Option<&'static str> {
    match content_type?.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

pub async fn read_text(field: Field<'_>) -> ApiResult<String> {
    field.text().await.map_err(multipart_error)
}

pub fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::bad_request(format!("Malformed multipart body: {}", e.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_image_types_are_accepted() {
        assert_eq!(image_extension(Some("image/jpeg")), Some("jpg"));
        assert_eq!(image_extension(Some("image/JPG")), Some("jpg"));
        assert_eq!(image_extension(Some("image/png")), Some("png"));
        assert_eq!(image_extension(Some("image/webp")), Some("webp"));
        assert_eq!(image_extension(Some("image/gif")), None);
        assert_eq!(image_extension(Some("text/plain")), None);
        assert_eq!(image_extension(None), None);
    }

    #[tokio::test]
    async fn saved_images_can_be_removed() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"), DEFAULT_MAX_UPLOAD_BYTES);
        let image = ImageUpload {
            bytes: Bytes::from_static(b"\x89PNG fake"),
            extension: "png",
        };

        let public_path = store.save_image("post", &image).await.unwrap();
        assert!(public_path.starts_with("/uploads/post-"));
        assert!(public_path.ends_with(".png"));

        let file_name = public_path.rsplit('/').next().unwrap();
        let on_disk = store.dir().join(file_name);
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"\x89PNG fake");

        store.remove(&public_path).await;
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn remove_ignores_directory_components() {
        let dir = tempfile::TempDir::new().unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, "x").unwrap();

        let store = UploadStore::new(dir.path().join("uploads"), DEFAULT_MAX_UPLOAD_BYTES);
        store.ensure_dir().await.unwrap();
        store.remove("/uploads/../keep.txt").await;

        assert!(outside.exists());
    }
}
