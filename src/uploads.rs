use std::path::PathBuf;

use bytes::Bytes;

use crate::error::{AppError, AppResult};

/// URL prefix under which stored images are served.
pub const PUBLIC_PREFIX: &str = "/uploads/";

/// Extension stored for each accepted image type. SVG is left out because it
/// can carry script.
fn image_extension(mime: &str) -> Option<&'static str> {
    match mime {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" => Some("bmp"),
        "image/avif" => Some("avif"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        _ => None,
    }
}

/// Local-disk image storage. Saved files are addressed by their public path
/// (`/uploads/<name>`), which is also what `delete` accepts.
pub struct ImageStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate and persist an image, returning its public path.
    pub async fn save(
        &self,
        data: Bytes,
        original_name: Option<&str>,
        content_type: Option<&str>,
    ) -> AppResult<String> {
        if data.is_empty() {
            return Err(AppError::validation("No image uploaded"));
        }
        if data.len() > self.max_bytes {
            return Err(AppError::validation(format!(
                "Image exceeds the {} byte limit",
                self.max_bytes
            )));
        }

        // Both the declared type and the name's type, when either is known,
        // must be a raster image. The stored extension comes from the type.
        let guessed = original_name
            .and_then(|n| mime_guess::from_path(n).first())
            .map(|m| m.essence_str().to_string());
        let mime = content_type
            .map(|c| c.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .or_else(|| guessed.clone())
            .unwrap_or_default();
        let ext = image_extension(&mime)
            .filter(|_| guessed.as_deref().map_or(true, |g| image_extension(g).is_some()))
            .ok_or_else(|| AppError::validation("Only image files are allowed!"))?;

        let file_name = format!("image-{}.{}", uuid::Uuid::now_v7(), ext);
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), &data).await?;

        tracing::info!(file = %file_name, bytes = data.len(), "Stored uploaded image");
        Ok(format!("{}{}", PUBLIC_PREFIX, file_name))
    }

    /// Remove a previously stored image. Returns false when nothing was there.
    pub async fn delete(&self, public_path: &str) -> AppResult<bool> {
        let name = public_path
            .strip_prefix(PUBLIC_PREFIX)
            .ok_or_else(|| AppError::validation("Image URL must start with /uploads/"))?;

        // Reject anything that could escape the upload directory.
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(AppError::validation("Invalid image URL"));
        }

        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => {
                tracing::info!(file = %name, "Deleted uploaded image");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &std::path::Path) -> ImageStore {
        ImageStore::new(dir, 16)
    }

    #[tokio::test]
    async fn saves_and_deletes_image() {
        let tmp = tempfile::tempdir().unwrap();
        let images = store(tmp.path());

        let url = images
            .save(Bytes::from_static(b"\x89PNG...."), Some("cat.PNG"), Some("image/png"))
            .await
            .unwrap();
        assert!(url.starts_with("/uploads/image-"));
        assert!(url.ends_with(".png"));

        let name = url.strip_prefix(PUBLIC_PREFIX).unwrap();
        assert!(tmp.path().join(name).exists());

        assert!(images.delete(&url).await.unwrap());
        assert!(!images.delete(&url).await.unwrap());
    }

    #[tokio::test]
    async fn guesses_type_from_file_name() {
        let tmp = tempfile::tempdir().unwrap();
        let url = store(tmp.path())
            .save(Bytes::from_static(b"jpegdata"), Some("photo.jpg"), None)
            .await
            .unwrap();
        assert!(url.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn rejects_non_images() {
        let tmp = tempfile::tempdir().unwrap();
        let err = store(tmp.path())
            .save(Bytes::from_static(b"hello"), Some("notes.txt"), Some("text/plain"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn extension_follows_type_not_file_name() {
        let tmp = tempfile::tempdir().unwrap();
        let images = store(tmp.path());

        let url = images
            .save(Bytes::from_static(b"gifdata"), Some("anim.weird"), Some("image/gif"))
            .await
            .unwrap();
        assert!(url.ends_with(".gif"));

        for (name, declared) in [
            ("evil.html", Some("image/png")),
            ("evil.png", Some("text/html")),
            ("logo.svg", Some("image/svg+xml")),
            ("logo.svg", None),
        ] {
            let err = images
                .save(Bytes::from_static(b"<script>"), Some(name), declared)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{} / {:?}", name, declared);
        }
    }

    #[tokio::test]
    async fn rejects_oversized_and_empty_payloads() {
        let tmp = tempfile::tempdir().unwrap();
        let images = store(tmp.path());
        let big = Bytes::from(vec![0u8; 17]);
        assert!(images.save(big, Some("a.png"), Some("image/png")).await.is_err());
        assert!(images
            .save(Bytes::new(), Some("a.png"), Some("image/png"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn delete_refuses_path_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let images = store(tmp.path());
        assert!(images.delete("/uploads/../secret").await.is_err());
        assert!(images.delete("/etc/passwd").await.is_err());
    }
}
