mod file;

pub use file::{BytesSource, FileSource};

use image::RgbaImage;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {name}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

/// Trait for base image sources
pub trait ImageSource {
    /// Load and decode the image as RGBA
    fn load(&mut self) -> Result<RgbaImage, SourceError>;

    /// Human-readable origin, for logs
    fn describe(&self) -> String;
}
