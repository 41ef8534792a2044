mod stack;

pub use stack::{LayerStack, SharedStack};

use crate::color::Color;
use crate::compositor::BlendMode;
use crate::mask::Mask;
use crate::selection::Seed;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("refusing to add a layer whose mask paints nothing")]
    EmptyMask,

    #[error("mask is {found:?} but the canvas is {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("opacity {0} is outside 0.0..=1.0")]
    InvalidOpacity(f32),

    #[error("no layer with id {0}")]
    UnknownLayer(LayerId),
}

/// One recolored part: a mask plus the paint applied through it.
///
/// The mask is shared and never changes; only color and opacity are editable.
#[derive(Debug, Clone)]
pub struct Layer {
    id: LayerId,
    mask: Arc<Mask>,
    color: Color,
    opacity: f32,
    blend: BlendMode,
    seed: Option<Seed>,
    label: Option<String>,
    confidence: Option<f32>,
}

impl Layer {
    pub fn new(mask: Mask, color: Color, opacity: f32) -> Result<Self, StackError> {
        if !mask.is_paintable() {
            return Err(StackError::EmptyMask);
        }
        check_opacity(opacity)?;

        Ok(Self {
            id: LayerId::new(),
            mask: Arc::new(mask),
            color,
            opacity,
            blend: BlendMode::default(),
            seed: None,
            label: None,
            confidence: None,
        })
    }

    /// Keep a known id, e.g. when replaying stored layers.
    pub fn with_id(mut self, id: LayerId) -> Self {
        self.id = id;
        self
    }

    pub fn with_seed(mut self, seed: Option<Seed>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    /// Opaque metadata from an external segmenter.
    pub fn with_label(mut self, label: Option<String>, confidence: Option<f32>) -> Self {
        self.label = label;
        self.confidence = confidence;
        self
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    pub fn seed(&self) -> Option<Seed> {
        self.seed
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }
}

fn check_opacity(opacity: f32) -> Result<(), StackError> {
    if (0.0..=1.0).contains(&opacity) {
        Ok(())
    } else {
        Err(StackError::InvalidOpacity(opacity))
    }
}
