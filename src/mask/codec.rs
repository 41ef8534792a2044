use super::{Mask, MaskError};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Render a mask as a displayable RGBA image: white where occupied,
/// alpha = mask value.
pub fn rasterize(mask: &Mask) -> RgbaImage {
    let (width, height) = mask.dimensions();
    RgbaImage::from_fn(width, height, |x, y| match mask.get(x, y) {
        0 => Rgba([0, 0, 0, 0]),
        a => Rgba([255, 255, 255, a]),
    })
}

/// Rasterize and encode as PNG, the stored/transmitted form of a layer mask.
pub fn encode_png(mask: &Mask) -> Result<Vec<u8>, MaskError> {
    let _span = tracing::debug_span!("encode_mask").entered();

    let mut bytes = Vec::new();
    rasterize(mask)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(MaskError::Encode)?;
    Ok(bytes)
}

/// Decode a mask image.
///
/// Occupancy comes from the alpha channel. Images without one (e.g. a
/// grayscale matte from a segmentation service) use their luma instead.
pub fn decode(bytes: &[u8]) -> Result<Mask, MaskError> {
    let _span = tracing::debug_span!("decode_mask").entered();

    let image = image::load_from_memory(bytes)?;
    if image.color().has_alpha() {
        return Ok(Mask::from_alpha(&image.into_rgba8()));
    }

    let luma = image.into_luma8();
    let (width, height) = luma.dimensions();
    Mask::from_raw(width, height, luma.into_raw())
}
