use super::BlendMode;
use crate::color::Color;
use image::Rgba;

/// Rec. 601 luma of an 8-bit RGB triple, normalized to [0, 1].
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0
}

/// Target color for one pixel under a layer.
///
/// `Multiply` scales the layer color by the brightness of the original pixel
/// so photographed shading survives the recolor; `Normal` is a flat fill.
pub fn tint(color: Color, original: &Rgba<u8>, mode: BlendMode) -> [f32; 3] {
    let [r, g, b] = color.channels();
    match mode {
        BlendMode::Multiply => {
            let l = luminance(original[0], original[1], original[2]);
            [r * l, g * l, b * l]
        }
        BlendMode::Normal => [r, g, b],
    }
}

/// Linear interpolation from `current` toward `target` by `factor`.
///
/// Factors of exactly 0 and 1 return the endpoints bit-for-bit.
#[inline]
pub fn blend(current: f32, target: f32, factor: f32) -> f32 {
    current * (1.0 - factor) + target * factor
}
