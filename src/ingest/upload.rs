//! Boundary side of a submission: validate the uploaded image, copy it into
//! the image directory under its content-addressed name and add the item.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::database::repo::{ItemId, ItemRepository, NewItem};
use crate::error::{Result, StoreError};
use crate::ingest::hasher::{hashed_image_name, has_image_extension, IMAGE_EXTENSION};
use crate::media::mimetype::{detect_mimetype, JPEG_MIME};

/// Raw form fields for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub image: Option<PathBuf>,
}

impl Submission {
    /// Store the image (if any), then add the item.
    ///
    /// An image file created by this call is removed again when the item
    /// insert fails. A file that was already there is left alone.
    pub fn submit(&self, repo: &ItemRepository, image_dir: &Path) -> Result<ItemId> {
        let stored = match &self.image {
            Some(path) => Some(store_image(path, image_dir)?),
            None => None,
        };

        let item = NewItem {
            name: self.name.clone(),
            category: self.category.clone(),
            image_filename: stored
                .as_ref()
                .map(|s| s.filename.clone())
                .unwrap_or_default(),
        };

        match repo.add(&item) {
            Ok(id) => Ok(id),
            Err(e) => {
                if let Some(image) = stored.filter(|s| s.created) {
                    let path = image_dir.join(&image.filename);
                    if let Err(remove_err) = fs::remove_file(&path) {
                        warn!("Failed to remove orphaned image {:?}: {}", path, remove_err);
                    }
                }
                Err(e)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub filename: String,
    /// False when a file with this name was already in the image directory.
    pub created: bool,
}

/// Copy `source` to `<image_dir>/<hashed name>`.
///
/// Re-uploading an image with the same name overwrites the earlier copy.
pub fn store_image(source: &Path, image_dir: &Path) -> Result<StoredImage> {
    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::validation(format!("Invalid image path: {:?}", source)))?;

    if !has_image_extension(file_name) {
        return Err(StoreError::validation(format!(
            "Image path does not end with {}",
            IMAGE_EXTENSION
        )));
    }

    let mime = detect_mimetype(source).map_err(|e| StoreError::validation(format!("{:#}", e)))?;
    if mime != JPEG_MIME {
        return Err(StoreError::validation(format!(
            "{:?} is not a JPEG image (detected {})",
            source, mime
        )));
    }

    let filename = hashed_image_name(file_name);
    fs::create_dir_all(image_dir)?;
    let destination = image_dir.join(&filename);
    let created = !destination.exists();
    fs::copy(source, &destination)?;

    debug!("Stored image {:?} as {:?}", source, destination);
    Ok(StoredImage { filename, created })
}
