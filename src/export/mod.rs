mod file;

pub use file::{encode, FileExport, MemoryExport, DEFAULT_JPEG_QUALITY};

use image::RgbaImage;
use std::path::Path;
use std::str::FromStr;

/// Export resolution relative to the source image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportScale {
    #[default]
    X1,
    X2,
    X4,
}

impl ExportScale {
    pub fn factor(self) -> u32 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }

    /// Output size for a source of `(width, height)`.
    pub fn apply(self, (width, height): (u32, u32)) -> (u32, u32) {
        (width * self.factor(), height * self.factor())
    }
}

impl FromStr for ExportScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.strip_suffix(|c| c == 'x' || c == 'X').unwrap_or(trimmed) {
            "1" => Ok(Self::X1),
            "2" => Ok(Self::X2),
            "4" => Ok(Self::X4),
            _ => Err(format!("unsupported scale {s:?} (use 1x, 2x or 4x)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl ExportFormat {
    /// Guess from a file extension, defaulting to PNG.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            other => Err(format!("unsupported export format {other:?}")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to encode {format:?} output")]
    Encode {
        format: ExportFormat,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write {path}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Trait for export destinations
pub trait ExportSink {
    /// Write a flattened render
    fn write_image(&mut self, image: &RgbaImage) -> Result<(), ExportError>;

    /// Format the sink encodes to
    fn format(&self) -> ExportFormat;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_parsing() {
        assert_eq!("2x".parse::<ExportScale>().unwrap(), ExportScale::X2);
        assert_eq!("4".parse::<ExportScale>().unwrap(), ExportScale::X4);
        assert!("3x".parse::<ExportScale>().is_err());
        assert_eq!(ExportScale::X4.apply((10, 3)), (40, 12));
    }

    #[test]
    fn test_scale_suffix_appears_once() {
        assert_eq!("1X".parse::<ExportScale>().unwrap(), ExportScale::X1);
        assert!("2xx".parse::<ExportScale>().is_err());
        assert!("x".parse::<ExportScale>().is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("out.JPG")), ExportFormat::Jpeg);
        assert_eq!(ExportFormat::from_path(Path::new("out.png")), ExportFormat::Png);
        assert_eq!(ExportFormat::from_path(Path::new("out")), ExportFormat::Png);
    }
}
