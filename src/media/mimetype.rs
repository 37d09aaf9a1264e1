use std::path::Path;
use anyhow::{Result, Context};

pub const JPEG_MIME: &str = "image/jpeg";

pub fn detect_mimetype(path: &Path) -> Result<String> {
    let kind = infer::get_from_path(path)
        .with_context(|| format!("Failed to read file for mimetype detection: {:?}", path))?;

    match kind {
        Some(k) => Ok(k.mime_type().to_string()),
        None => Ok("application/octet-stream".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    // SOI marker followed by a JFIF APP0 segment header
    const JPEG_HEADER: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00,
    ];

    #[test]
    fn test_detects_jpeg() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("photo.jpg");
        fs::write(&path, JPEG_HEADER)?;

        assert_eq!(detect_mimetype(&path)?, JPEG_MIME);
        Ok(())
    }

    #[test]
    fn test_unknown_content_is_octet_stream() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("notes.jpg");
        fs::write(&path, b"plain text pretending to be a photo")?;

        assert_eq!(detect_mimetype(&path)?, "application/octet-stream");
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(detect_mimetype(Path::new("does/not/exist.jpg")).is_err());
    }
}
