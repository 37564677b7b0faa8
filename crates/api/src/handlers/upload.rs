//! Multipart file extraction shared by the upload handlers.

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::AppResult;

/// A file part pulled out of a multipart body.
#[derive(Debug)]
pub struct UploadedFile {
    /// Client-supplied filename; empty when the part carried none.
    pub file_name: String,
    pub bytes: Bytes,
}

/// Return the first part named `field`, skipping all others.
pub async fn take_file(multipart: &mut Multipart, field: &str) -> AppResult<Option<UploadedFile>> {
    while let Some(part) = multipart.next_field().await? {
        if part.name() != Some(field) {
            continue;
        }
        let file_name = part.file_name().unwrap_or_default().trim().to_string();
        let bytes = part.bytes().await?;
        return Ok(Some(UploadedFile { file_name, bytes }));
    }
    Ok(None)
}

/// Lowercased extension of `file_name` if it is one of `allowed`.
pub fn allowed_extension(file_name: &str, allowed: &[&str]) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    allowed.contains(&ext.as_str()).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGES: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

    #[test]
    fn extension_check_is_case_insensitive() {
        assert_eq!(allowed_extension("scan.PNG", IMAGES).as_deref(), Some("png"));
        assert_eq!(allowed_extension("a.b.tiff", IMAGES).as_deref(), Some("tiff"));
    }

    #[test]
    fn missing_or_unknown_extensions_are_rejected() {
        assert_eq!(allowed_extension("scan", IMAGES), None);
        assert_eq!(allowed_extension("scan.webp", IMAGES), None);
        assert_eq!(allowed_extension("scan.", IMAGES), None);
    }
}
