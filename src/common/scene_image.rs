use crate::error::AppError;
use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// An uploaded accident-scene photo.
///
/// The raster is shared behind an `Arc`; stages read it and allocate their own
/// output images, so the caller's pixels are never modified.
#[derive(Debug, Clone)]
pub struct SceneImage {
    id: Uuid,
    image: Arc<DynamicImage>,
    source: String,
    received_at: DateTime<Utc>,
}

impl SceneImage {
    pub fn new(image: DynamicImage, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            image: Arc::new(image),
            source: source.into(),
            received_at: Utc::now(),
        }
    }

    /// Decodes an uploaded file body (JPEG, PNG, ...).
    pub fn from_bytes(bytes: &[u8], source: impl Into<String>) -> Result<Self, AppError> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::new(image, source))
    }

    pub fn open(path: &Path) -> Result<Self, AppError> {
        let image = image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?;
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(image, source))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}
