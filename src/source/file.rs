use super::{ImageSource, SourceError};
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};

/// Image file on disk (PNG, JPEG, or anything else `image` decodes).
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ImageSource for FileSource {
    fn load(&mut self) -> Result<RgbaImage, SourceError> {
        tracing::info!("Loading image from {}", self.path.display());

        let bytes = fs::read(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;

        BytesSource::new(self.describe(), bytes).load()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Encoded image already in memory, e.g. an upload.
pub struct BytesSource {
    name: String,
    bytes: Vec<u8>,
}

impl BytesSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

impl ImageSource for BytesSource {
    fn load(&mut self) -> Result<RgbaImage, SourceError> {
        let _span = tracing::debug_span!("decode_image").entered();

        let image = image::load_from_memory(&self.bytes)
            .map_err(|source| SourceError::Decode {
                name: self.name.clone(),
                source,
            })?
            .into_rgba8();

        let (width, height) = image.dimensions();
        tracing::info!("Decoded {} ({}x{})", self.name, width, height);
        Ok(image)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
