use crate::{
    config::media::MediaConfig,
    error::AppResult,
    utils::form::{FormData, FormErrors, UploadedFile},
};
use anyhow::Context;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5 MB
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

pub const AVATARS_DIR: &str = "avatars";
pub const THUMBNAILS_DIR: &str = "thumbnails";

/// Validate file magic bytes match the declared content type.
fn validate_magic_bytes(data: &[u8], content_type: &str) -> bool {
    match content_type {
        "image/jpeg" => data.len() >= 3 && data[..3] == [0xFF, 0xD8, 0xFF],
        "image/png" => data.len() >= 4 && data[..4] == [0x89, 0x50, 0x4E, 0x47],
        "image/gif" => data.len() >= 4 && data[..4] == [0x47, 0x49, 0x46, 0x38],
        "image/webp" => {
            data.len() >= 12
                && data[..4] == [0x52, 0x49, 0x46, 0x46]
                && data[8..12] == [0x57, 0x45, 0x42, 0x50]
        }
        _ => false,
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// An upload that passed [`UploadService::check_image`], ready to be written.
#[derive(Debug)]
pub struct CheckedImage {
    file: UploadedFile,
    ext: &'static str,
}

pub struct UploadService {
    media: MediaConfig,
}

impl UploadService {
    pub fn new(media: MediaConfig) -> Self {
        Self { media }
    }

    /// Accept JPEG, PNG, GIF and WebP images up to 5 MB whose content matches
    /// the declared type. The error is a message for the form field.
    pub fn check_image(file: UploadedFile) -> Result<CheckedImage, String> {
        if file.data.is_empty() {
            return Err("The submitted file is empty.".to_string());
        }

        if file.data.len() > MAX_FILE_SIZE {
            return Err("File too large. Maximum size is 5 MB.".to_string());
        }

        let content_type = file.content_type.trim().to_ascii_lowercase();
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(format!(
                "Unsupported file type: {}. Allowed: jpeg, png, gif, webp",
                file.content_type
            ));
        }

        if !validate_magic_bytes(&file.data, &content_type) {
            return Err("File content does not match declared content type".to_string());
        }

        let ext = extension_for(&content_type)
            .ok_or_else(|| "Unsupported file type".to_string())?;
        Ok(CheckedImage { file, ext })
    }

    /// Take the optional image in file field `field`, recording a field
    /// error when it is rejected.
    pub fn take_image(form: &mut FormData, field: &str, errors: &mut FormErrors) -> Option<CheckedImage> {
        match form.take_file(field).map(Self::check_image) {
            Some(Ok(image)) => Some(image),
            Some(Err(message)) => {
                errors.add(field, message);
                None
            }
            None => None,
        }
    }

    /// Write the image under `<root>/<subdirectory>/` with a random name.
    /// Returns its public URL (e.g., `/media/avatars/<uuid>.png`).
    pub async fn save_image(&self, image: CheckedImage, subdirectory: &str) -> AppResult<String> {
        let filename = format!("{}.{}", Uuid::new_v4(), image.ext);
        let dir = Path::new(&self.media.root).join(subdirectory);

        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

        let file_path = dir.join(&filename);
        fs::write(&file_path, &image.file.data)
            .await
            .with_context(|| format!("Failed to write upload {}", file_path.display()))?;

        tracing::debug!(
            "Stored upload {} ({} bytes) as {}",
            image.file.file_name,
            image.file.data.len(),
            file_path.display()
        );

        Ok(format!("{}/{}/{}", self.media.url, subdirectory, filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn upload(content_type: &str, data: &'static [u8]) -> UploadedFile {
        UploadedFile {
            file_name: "image".to_string(),
            content_type: content_type.to_string(),
            data: Bytes::from_static(data),
        }
    }

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn jpeg_magic_bytes_valid() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        assert!(validate_magic_bytes(&data, "image/jpeg"));
    }

    #[test]
    fn webp_magic_bytes_valid() {
        let data = [
            0x52, 0x49, 0x46, 0x46, // RIFF
            0x00, 0x00, 0x00, 0x00, // size
            0x57, 0x45, 0x42, 0x50, // WEBP
        ];
        assert!(validate_magic_bytes(&data, "image/webp"));
    }

    #[test]
    fn too_short_data_rejected() {
        assert!(!validate_magic_bytes(&[0xFF, 0xD8], "image/jpeg"));
        assert!(!validate_magic_bytes(&[0x89, 0x50, 0x4E], "image/png"));
    }

    #[test]
    fn png_upload_accepted() {
        let checked = UploadService::check_image(upload("image/png", PNG)).unwrap();
        assert_eq!(checked.ext, "png");
    }

    #[test]
    fn mismatched_content_rejected() {
        let err = UploadService::check_image(upload("image/jpeg", PNG)).unwrap_err();
        assert!(err.contains("does not match"));
    }

    #[test]
    fn non_image_rejected() {
        let err = UploadService::check_image(upload("application/pdf", b"%PDF-1.7")).unwrap_err();
        assert!(err.starts_with("Unsupported file type"));
    }

    #[test]
    fn oversized_upload_rejected() {
        let mut data = PNG.to_vec();
        data.resize(MAX_FILE_SIZE + 1, 0);
        let file = UploadedFile {
            file_name: "big.png".to_string(),
            content_type: "image/png".to_string(),
            data: Bytes::from(data),
        };
        assert!(UploadService::check_image(file).is_err());
    }

    #[tokio::test]
    async fn saved_image_lands_under_media_root() {
        let root = std::env::temp_dir().join(format!("flixblog-media-{}", Uuid::new_v4()));
        let service = UploadService::new(MediaConfig::new(root.to_string_lossy(), "/media"));
        let checked = UploadService::check_image(upload("image/png", PNG)).unwrap();

        let url = service.save_image(checked, AVATARS_DIR).await.unwrap();
        assert!(url.starts_with("/media/avatars/"));
        assert!(url.ends_with(".png"));

        let file_name = url.rsplit('/').next().unwrap();
        let stored = std::fs::read(root.join(AVATARS_DIR).join(file_name)).unwrap();
        assert_eq!(stored, PNG);
        let _ = std::fs::remove_dir_all(root);
    }
}
