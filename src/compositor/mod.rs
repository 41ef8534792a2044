mod recolor;
mod resample;

pub use recolor::{blend, luminance, tint};
pub use resample::NearestMap;

use crate::layers::{Layer, LayerId};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mask alpha (normalized) at or below this does not touch the pixel.
const COVERAGE_EPSILON: f32 = 0.01;

/// Whether a mask alpha is strong enough for the compositor to paint through.
pub fn covers(alpha: u8) -> bool {
    alpha as f32 / 255.0 > COVERAGE_EPSILON
}

/// How a layer's color is derived per pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Color scaled by the original pixel's luminance
    #[default]
    Multiply,
    /// Flat color fill
    Normal,
}

impl FromStr for BlendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "multiply" => Ok(Self::Multiply),
            "normal" => Ok(Self::Normal),
            other => Err(format!("unknown blend mode {other:?}")),
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Multiply => "multiply",
            Self::Normal => "normal",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("base image is {width}x{height}, nothing to render from")]
    EmptyBase { width: u32, height: u32 },

    #[error("cannot render to a {width}x{height} output")]
    EmptyOutput { width: u32, height: u32 },

    #[error("layer {layer} mask is {found:?} but the base image is {expected:?}")]
    DimensionMismatch {
        layer: LayerId,
        expected: (u32, u32),
        found: (u32, u32),
    },
}

/// Render `layers` in order over `base` at `output` size.
///
/// Each layer blends the running result toward its tint by
/// `mask_alpha * opacity`; the tint's luminance always comes from the untouched
/// base pixel. Base and masks are sampled through one [`NearestMap`], and the
/// base alpha is carried through unchanged. Rendering is pure: the same inputs
/// give identical pixels.
pub fn composite(
    base: &RgbaImage,
    layers: &[Layer],
    output: (u32, u32),
) -> Result<RgbaImage, CompositeError> {
    let (out_w, out_h) = output;
    let (width, height) = base.dimensions();
    if width == 0 || height == 0 {
        return Err(CompositeError::EmptyBase { width, height });
    }
    if out_w == 0 || out_h == 0 {
        return Err(CompositeError::EmptyOutput {
            width: out_w,
            height: out_h,
        });
    }

    for layer in layers {
        if layer.mask().dimensions() != (width, height) {
            return Err(CompositeError::DimensionMismatch {
                layer: layer.id(),
                expected: (width, height),
                found: layer.mask().dimensions(),
            });
        }
    }

    let _span =
        tracing::debug_span!("composite", layers = layers.len(), out_w, out_h).entered();

    let map = NearestMap::new((width, height), output);

    // Working buffer lives for this call only
    let mut buffer = vec![0f32; out_w as usize * out_h as usize * 4];
    for (i, sx, sy) in map.iter() {
        let pixel = base.get_pixel(sx, sy);
        for c in 0..4 {
            buffer[i * 4 + c] = pixel[c] as f32;
        }
    }

    for layer in layers {
        apply_layer(&mut buffer, base, layer, &map);
    }

    Ok(RgbaImage::from_fn(out_w, out_h, |x, y| {
        let i = (y as usize * out_w as usize + x as usize) * 4;
        Rgba([
            to_channel(buffer[i]),
            to_channel(buffer[i + 1]),
            to_channel(buffer[i + 2]),
            to_channel(buffer[i + 3]),
        ])
    }))
}

fn apply_layer(buffer: &mut [f32], base: &RgbaImage, layer: &Layer, map: &NearestMap) {
    let mask = layer.mask();
    let opacity = layer.opacity();

    for (i, sx, sy) in map.iter() {
        let alpha = mask.get(sx, sy);
        if !covers(alpha) {
            continue;
        }

        let factor = alpha as f32 / 255.0 * opacity;
        let target = tint(layer.color(), base.get_pixel(sx, sy), layer.blend());
        let px = &mut buffer[i * 4..i * 4 + 3];
        for (channel, t) in px.iter_mut().zip(target) {
            *channel = blend(*channel, t, factor);
        }
    }
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::mask::Mask;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn full_mask(width: u32, height: u32) -> Mask {
        Mask::from_raw(width, height, vec![255; (width * height) as usize]).unwrap()
    }

    fn left_half(width: u32, height: u32) -> Mask {
        let data = (0..height)
            .flat_map(|_| (0..width).map(move |x| if x < width / 2 { 255 } else { 0 }))
            .collect();
        Mask::from_raw(width, height, data).unwrap()
    }

    fn layer(mask: Mask, color: Color, opacity: f32) -> Layer {
        Layer::new(mask, color, opacity).unwrap()
    }

    fn photo() -> RgbaImage {
        RgbaImage::from_fn(6, 4, |x, y| {
            Rgba([(x * 40) as u8, (y * 60) as u8, ((x + y) * 20) as u8, 255])
        })
    }

    #[test]
    fn test_empty_stack_is_identity() {
        let base = photo();
        assert_eq!(composite(&base, &[], (6, 4)).unwrap(), base);
    }

    #[test]
    fn test_zero_opacity_changes_nothing() {
        let base = photo();
        let layers = [layer(full_mask(6, 4), Color::new(0, 255, 0), 0.0)];
        assert_eq!(composite(&base, &layers, (6, 4)).unwrap(), base);
    }

    #[test]
    fn test_full_opacity_replaces_with_tint() {
        let base = photo();
        let color = Color::new(30, 200, 90);
        let layers = [layer(full_mask(6, 4), color, 1.0)];
        let out = composite(&base, &layers, (6, 4)).unwrap();

        for (x, y, pixel) in out.enumerate_pixels() {
            let expected = tint(color, base.get_pixel(x, y), BlendMode::Multiply);
            for c in 0..3 {
                assert_eq!(pixel[c], to_channel(expected[c]));
            }
            assert_eq!(pixel[3], 255);
        }
    }

    #[test]
    fn test_red_to_blue_keeps_brightness() {
        let base = RgbaImage::from_pixel(4, 4, RED);
        let layers = [layer(full_mask(4, 4), Color::new(0, 0, 255), 1.0)];
        let out = composite(&base, &layers, (4, 4)).unwrap();

        // 255 * 0.299 = 76.245
        for pixel in out.pixels() {
            assert_eq!(*pixel, Rgba([0, 0, 76, 255]));
        }
    }

    #[test]
    fn test_unmasked_pixels_untouched() {
        let base = photo();
        let layers = [layer(left_half(6, 4), Color::new(255, 255, 0), 1.0)];
        let out = composite(&base, &layers, (6, 4)).unwrap();

        for y in 0..4 {
            for x in 3..6 {
                assert_eq!(out.get_pixel(x, y), base.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn test_faint_mask_pixels_are_ignored() {
        let base = photo();
        let mut data = vec![2; 24];
        data[0] = 255;
        let layers = [layer(Mask::from_raw(6, 4, data).unwrap(), Color::new(255, 255, 255), 1.0)];
        let out = composite(&base, &layers, (6, 4)).unwrap();

        assert_ne!(out.get_pixel(0, 0), base.get_pixel(0, 0));
        for (x, y, pixel) in out.enumerate_pixels().skip(1) {
            assert_eq!(pixel, base.get_pixel(x, y));
        }
    }

    #[test]
    fn test_coverage_threshold() {
        assert!(!covers(0));
        assert!(!covers(2));
        assert!(covers(3));
    }

    #[test]
    fn test_layer_order_matters() {
        let base = RgbaImage::from_pixel(4, 4, Rgba([180, 180, 180, 255]));
        let a = layer(full_mask(4, 4), Color::new(255, 0, 0), 0.6);
        let b = layer(left_half(4, 4), Color::new(0, 0, 255), 0.6);

        let ab = composite(&base, &[a.clone(), b.clone()], (4, 4)).unwrap();
        let ba = composite(&base, &[b, a], (4, 4)).unwrap();

        // Overlap differs, the A-only half does not
        assert_ne!(ab.get_pixel(0, 0), ba.get_pixel(0, 0));
        assert_eq!(ab.get_pixel(3, 0), ba.get_pixel(3, 0));
    }

    #[test]
    fn test_later_layer_builds_on_earlier() {
        let base = RgbaImage::from_pixel(2, 2, Rgba([200, 200, 200, 255]));
        let first = layer(full_mask(2, 2), Color::new(255, 0, 0), 0.5);
        let second = layer(full_mask(2, 2), Color::new(255, 0, 0), 0.5);

        let once = composite(&base, std::slice::from_ref(&first), (2, 2)).unwrap();
        let twice = composite(&base, &[first, second], (2, 2)).unwrap();

        // Green moves halfway toward 0 each pass: 200 -> 100 -> 50
        assert_eq!(once.get_pixel(0, 0)[1], 100);
        assert_eq!(twice.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_upscale_aligns_mask_with_base() {
        let base = photo();
        let layers = [layer(left_half(6, 4), Color::new(0, 128, 255), 0.8)];
        let small = composite(&base, &layers, (6, 4)).unwrap();
        let large = composite(&base, &layers, (12, 8)).unwrap();

        for (x, y, pixel) in small.enumerate_pixels() {
            for dy in 0..2 {
                for dx in 0..2 {
                    assert_eq!(large.get_pixel(x * 2 + dx, y * 2 + dy), pixel);
                }
            }
        }
    }

    #[test]
    fn test_mismatched_mask_fails_fast() {
        let base = photo();
        let layers = [layer(full_mask(3, 2), Color::new(0, 0, 0), 1.0)];
        assert!(matches!(
            composite(&base, &layers, (6, 4)),
            Err(CompositeError::DimensionMismatch { expected: (6, 4), found: (3, 2), .. })
        ));
    }

    #[test]
    fn test_empty_base_is_reported_as_base() {
        let empty = RgbaImage::new(0, 0);
        assert!(matches!(
            composite(&empty, &[], (4, 4)),
            Err(CompositeError::EmptyBase { width: 0, height: 0 })
        ));
    }

    #[test]
    fn test_normal_layer_paints_flat_color() {
        let base = photo();
        let color = Color::new(30, 200, 90);
        let layers = [layer(full_mask(6, 4), color, 1.0).with_blend(BlendMode::Normal)];
        let out = composite(&base, &layers, (6, 4)).unwrap();

        for pixel in out.pixels() {
            assert_eq!(*pixel, Rgba([30, 200, 90, 255]));
        }

        // Half opacity lands midway between the photo and the flat color
        let half = [layer(full_mask(6, 4), color, 0.5).with_blend(BlendMode::Normal)];
        let out = composite(&base, &half, (6, 4)).unwrap();
        let (before, after) = (base.get_pixel(5, 3), out.get_pixel(5, 3));
        assert_eq!(after[0], to_channel(before[0] as f32 * 0.5 + 15.0));
        assert_eq!(after[1], to_channel(before[1] as f32 * 0.5 + 100.0));
    }

    #[test]
    fn test_zero_output_rejected() {
        assert!(matches!(
            composite(&photo(), &[], (0, 4)),
            Err(CompositeError::EmptyOutput { .. })
        ));
    }

    #[test]
    fn test_blend_mode_strings() {
        assert_eq!("Multiply".parse::<BlendMode>().unwrap(), BlendMode::Multiply);
        assert_eq!(BlendMode::Normal.to_string(), "normal");
        assert_eq!(serde_json::to_string(&BlendMode::default()).unwrap(), "\"multiply\"");
        assert!("screen".parse::<BlendMode>().is_err());
    }
}
