use std::path::Path;
use sha2::{Sha256, Digest};

pub const IMAGE_EXTENSION: &str = ".jpg";

/// Accepted upload names end in `.jpg`, exactly.
pub fn has_image_extension(file_name: &str) -> bool {
    file_name.ends_with(IMAGE_EXTENSION)
}

/// Content-addressed name for an uploaded image: hex SHA-256 of the base name
/// (everything before the last `.`) followed by `.jpg`.
///
/// Any directory part is ignored, so the same upload name always lands on the
/// same stored file.
pub fn hashed_image_name(file_name: &str) -> String {
    let file_name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);

    let base = match file_name.rsplit_once('.') {
        Some((base, _ext)) => base,
        None => file_name,
    };

    let digest = Sha256::digest(base.as_bytes());
    format!("{}{}", hex::encode(digest), IMAGE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_name_is_sha256_of_base_name() {
        assert_eq!(
            hashed_image_name("local_image.jpg"),
            "2d32c5a20662475a36c87332b4e52437011079b086589eaf991bf55b03393156.jpg"
        );
    }

    #[test]
    fn test_hashed_name_is_deterministic() {
        let first = hashed_image_name("sneakers.jpg");
        let second = hashed_image_name("sneakers.jpg");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64 + IMAGE_EXTENSION.len());
        assert!(first[..64].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hashed_name_ignores_directories() {
        assert_eq!(
            hashed_image_name("uploads/2022/local_image.jpg"),
            hashed_image_name("local_image.jpg")
        );
    }

    #[test]
    fn test_only_final_extension_is_stripped() {
        assert_ne!(hashed_image_name("a.b.jpg"), hashed_image_name("a.jpg"));
        assert_eq!(hashed_image_name("a.b.jpg"), hashed_image_name("a.b.png"));
    }

    #[test]
    fn test_name_without_extension_hashes_whole_name() {
        assert_eq!(hashed_image_name("noext"), hashed_image_name("noext.jpg"));
        assert_eq!(
            hashed_image_name(".jpg"),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855.jpg"
        );
    }

    #[test]
    fn test_image_extension_check() {
        assert!(has_image_extension("photo.jpg"));
        assert!(!has_image_extension("photo.jpeg"));
        assert!(!has_image_extension("photo.JPG"));
        assert!(!has_image_extension("photo.jpg.png"));
    }
}
