mod grower;

pub use grower::{color_distance, grow};

use serde::{Deserialize, Serialize};

/// Multiplier from per-channel tolerance to a Euclidean RGB cutoff.
pub const TOLERANCE_SCALE: f32 = 1.7;

pub const DEFAULT_TOLERANCE: f32 = 32.0;

/// Pixels with alpha at or below this are background and never selected.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 10;

/// Click position in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed {
    pub x: u32,
    pub y: u32,
}

impl Seed {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn in_bounds(&self, width: u32, height: u32) -> bool {
        self.x < width && self.y < height
    }
}

/// Settings for the built-in flood-fill selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    /// Per-channel tolerance in 0-255 units
    pub tolerance: f32,
    pub alpha_threshold: u8,
    /// Run majority-vote smoothing on the grown mask
    pub smooth: bool,
}

impl SelectionConfig {
    /// Reject tolerances that cannot order selections (negative, NaN or infinite).
    pub fn validate(&self) -> Result<(), SelectionError> {
        if self.tolerance.is_finite() && self.tolerance >= 0.0 {
            Ok(())
        } else {
            Err(SelectionError::InvalidTolerance(self.tolerance))
        }
    }

    /// Maximum Euclidean RGB distance from the seed color.
    pub fn cutoff(&self) -> f32 {
        self.tolerance * TOLERANCE_SCALE
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            smooth: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("seed ({x}, {y}) is outside the {width}x{height} image")]
    InvalidSeed {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("tolerance {0} must be a finite value of at least 0")]
    InvalidTolerance(f32),

    #[error("nothing selectable at ({x}, {y}); try a different spot")]
    EmptySelection { x: u32, y: u32 },
}
