mod codec;
mod smooth;

pub use codec::{decode, encode_png, rasterize};
pub use smooth::smooth;

use crate::compositor;
use image::RgbaImage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Occupancy mask: one alpha value per source pixel, 255 = inside the part,
/// 0 = outside. Stored row-major as `[row, column]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    alpha: Array2<u8>,
}

/// Axis-aligned bounds of the occupied pixels of a mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum MaskError {
    #[error("failed to decode mask image")]
    Decode(#[from] image::ImageError),

    #[error("failed to encode mask image")]
    Encode(#[source] image::ImageError),

    #[error("mask data has {len} values, expected {width}x{height}")]
    Shape { width: u32, height: u32, len: usize },
}

impl Mask {
    /// All-zero mask of the given size.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            alpha: Array2::zeros((height as usize, width as usize)),
        }
    }

    /// Build a mask from row-major alpha values.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, MaskError> {
        let len = data.len();
        Array2::from_shape_vec((height as usize, width as usize), data)
            .map(|alpha| Self { alpha })
            .map_err(|_| MaskError::Shape { width, height, len })
    }

    /// Take occupancy from the alpha channel of an RGBA image.
    pub fn from_alpha(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            alpha: Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
                image.get_pixel(x as u32, y as u32)[3]
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.alpha.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.alpha.nrows() as u32
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Alpha at `(x, y)`. Panics when out of bounds, like `ImageBuffer::get_pixel`.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.alpha[[y as usize, x as usize]]
    }

    /// Number of pixels with non-zero alpha.
    pub fn area(&self) -> u32 {
        self.alpha.iter().filter(|&&a| a > 0).count() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.alpha.iter().all(|&a| a == 0)
    }

    /// True when at least one pixel is strong enough to be painted.
    pub fn is_paintable(&self) -> bool {
        self.alpha.iter().any(|&a| compositor::covers(a))
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;

        for ((y, x), &a) in self.alpha.indexed_iter() {
            if a == 0 {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((min_x, min_y, max_x, max_y)) => {
                    (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
                }
            });
        }

        bounds.map(|(min_x, min_y, max_x, max_y)| BoundingBox {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        })
    }

    pub fn as_array(&self) -> &Array2<u8> {
        &self.alpha
    }
}

impl From<Array2<u8>> for Mask {
    fn from(alpha: Array2<u8>) -> Self {
        Self { alpha }
    }
}
