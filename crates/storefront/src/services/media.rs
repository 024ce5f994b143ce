//! Local storage for uploaded product images.
//!
//! Files are written under `<media_root>/products/` with random names and
//! served back at `/media/<path>`.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Largest accepted upload (5 MB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Subdirectory for product images.
const PRODUCT_DIR: &str = "products";

/// Errors from image validation and storage.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Image file too large (max 5MB).")]
    TooLarge,

    #[error("File must be an image.")]
    NotAnImage,

    #[error("Could not store image: {0}")]
    Io(#[from] std::io::Error),
}

/// Check an upload's declared content type and size.
///
/// # Errors
///
/// Returns `MediaError::TooLarge` or `MediaError::NotAnImage`.
pub fn validate_image(content_type: &str, len: usize) -> Result<(), MediaError> {
    if len > MAX_IMAGE_BYTES {
        return Err(MediaError::TooLarge);
    }
    if !content_type.starts_with("image/") {
        return Err(MediaError::NotAnImage);
    }
    Ok(())
}

/// File extension for a stored image: the upload's own extension when it is
/// short and alphanumeric, otherwise one derived from the content type.
fn image_extension(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()));

    if let Some(ext) = from_name {
        return ext.to_ascii_lowercase();
    }

    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "img",
    }
    .to_owned()
}

/// Whether `relative` stays inside the product image directory.
fn is_product_image_path(relative: &str) -> bool {
    let path = Path::new(relative);
    let mut components = path.components();
    matches!(components.next(), Some(Component::Normal(dir)) if dir == PRODUCT_DIR)
        && components.all(|c| matches!(c, Component::Normal(_)))
}

/// Uploaded file storage rooted at the media directory.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The media root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate and write a product image.
    ///
    /// Returns the path relative to the media root, e.g.
    /// `products/3f0c....png`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for oversized or non-image uploads, or
    /// `MediaError::Io` if the file cannot be written.
    pub async fn save_product_image(
        &self,
        file_name: Option<&str>,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        validate_image(content_type, bytes.len())?;

        let dir = self.root.join(PRODUCT_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!(
            "{}.{}",
            Uuid::new_v4().simple(),
            image_extension(file_name, content_type)
        );
        tokio::fs::write(dir.join(&name), bytes).await?;

        tracing::debug!(file = %name, size = bytes.len(), "Stored product image");
        Ok(format!("{PRODUCT_DIR}/{name}"))
    }

    /// Remove a stored image. Failures are logged, never returned.
    pub async fn delete(&self, relative: &str) {
        if !is_product_image_path(relative) {
            tracing::warn!(path = %relative, "Refusing to delete path outside media directory");
            return;
        }

        match tokio::fs::remove_file(self.root.join(relative)).await {
            Ok(()) => tracing::debug!(path = %relative, "Deleted product image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %relative, error = %e, "Failed to delete image"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("bazaar-media-{}", Uuid::new_v4().simple()))
    }

    #[test]
    fn test_validate_image() {
        assert!(validate_image("image/png", 1024).is_ok());
        assert!(matches!(
            validate_image("text/plain", 10),
            Err(MediaError::NotAnImage)
        ));
        assert!(matches!(
            validate_image("image/png", MAX_IMAGE_BYTES + 1),
            Err(MediaError::TooLarge)
        ));
        assert!(validate_image("image/png", MAX_IMAGE_BYTES).is_ok());
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(Some("photo.JPG"), "image/jpeg"), "jpg");
        assert_eq!(image_extension(Some("noext"), "image/png"), "png");
        assert_eq!(image_extension(Some("x.p$g"), "image/webp"), "webp");
        assert_eq!(image_extension(None, "image/x-unknown"), "img");
    }

    #[test]
    fn test_is_product_image_path() {
        assert!(is_product_image_path("products/abc.png"));
        assert!(!is_product_image_path("products/../secret"));
        assert!(!is_product_image_path("/etc/passwd"));
        assert!(!is_product_image_path("other/abc.png"));
    }

    #[tokio::test]
    async fn test_save_and_delete_round_trip() {
        let root = temp_root();
        let storage = MediaStorage::new(&root);

        let relative = storage
            .save_product_image(Some("teapot.png"), "image/png", b"\x89PNG")
            .await
            .expect("saved");
        assert!(relative.starts_with("products/"));
        assert!(relative.ends_with(".png"));
        assert!(root.join(&relative).exists());

        storage.delete(&relative).await;
        assert!(!root.join(&relative).exists());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_save_rejects_non_image() {
        let storage = MediaStorage::new(temp_root());
        let result = storage
            .save_product_image(Some("notes.txt"), "text/plain", b"hello")
            .await;
        assert!(matches!(result, Err(MediaError::NotAnImage)));
    }
}
