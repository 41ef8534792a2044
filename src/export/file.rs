use super::{ExportError, ExportFormat, ExportSink};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Encode a render as PNG (with alpha) or JPEG (alpha dropped).
pub fn encode(image: &RgbaImage, format: ExportFormat, quality: u8) -> Result<Vec<u8>, ExportError> {
    let _span = tracing::debug_span!("encode", ?format).entered();

    let mut bytes = Vec::new();
    let result = match format {
        ExportFormat::Png => image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png),
        ExportFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).encode_image(&rgb)
        }
    };
    result.map_err(|source| ExportError::Encode { format, source })?;

    Ok(bytes)
}

/// Writes each export to a file, replacing it.
pub struct FileExport {
    path: PathBuf,
    format: ExportFormat,
    quality: u8,
}

impl FileExport {
    pub fn new<P: AsRef<Path>>(path: P, format: ExportFormat, quality: u8) -> Self {
        let path = path.as_ref().to_path_buf();
        tracing::info!("Exporting {:?} to {}", format, path.display());
        Self {
            path,
            format,
            quality,
        }
    }
}

impl ExportSink for FileExport {
    fn write_image(&mut self, image: &RgbaImage) -> Result<(), ExportError> {
        let bytes = encode(image, self.format, self.quality)?;
        fs::write(&self.path, &bytes).map_err(|source| ExportError::Io {
            path: self.path.clone(),
            source,
        })?;

        let (width, height) = image.dimensions();
        tracing::info!(
            "Wrote {}x{} image to {} ({} bytes)",
            width,
            height,
            self.path.display(),
            bytes.len()
        );
        Ok(())
    }

    fn format(&self) -> ExportFormat {
        self.format
    }
}

/// Keeps the latest export in memory, ready to hand to a download.
pub struct MemoryExport {
    format: ExportFormat,
    quality: u8,
    bytes: Vec<u8>,
}

impl MemoryExport {
    pub fn new(format: ExportFormat, quality: u8) -> Self {
        Self {
            format,
            quality,
            bytes: Vec::new(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl ExportSink for MemoryExport {
    fn write_image(&mut self, image: &RgbaImage) -> Result<(), ExportError> {
        self.bytes = encode(image, self.format, self.quality)?;
        Ok(())
    }

    fn format(&self) -> ExportFormat {
        self.format
    }
}
