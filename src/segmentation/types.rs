use crate::mask::{BoundingBox, Mask};
use crate::selection::{Seed, SelectionError};
use image::RgbaImage;

/// What to segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// The part under a clicked pixel
    Point(Seed),
    /// Every part the model can find
    Everything,
}

/// One mask returned by a model, with whatever metadata the model attaches.
///
/// Label and confidence are opaque here; area and bounds describe the mask.
#[derive(Debug, Clone)]
pub struct Segment {
    pub mask: Mask,
    pub label: Option<String>,
    pub confidence: Option<f32>,
    pub bounding_box: Option<BoundingBox>,
    pub area: u32,
}

impl Segment {
    pub fn from_mask(mask: Mask) -> Self {
        let bounding_box = mask.bounding_box();
        let area = mask.area();
        Self {
            mask,
            label: None,
            confidence: None,
            bounding_box,
            area,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SegmentationError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("{model} does not support {prompt:?} prompts")]
    Unsupported { model: &'static str, prompt: Prompt },

    #[error("segmentation service failed: {0}")]
    ExternalService(String),
}

/// Trait for segmentation backends
/// Allows swapping the built-in flood fill for masks from an external service
pub trait SegmentationModel {
    /// Segment `image` for `prompt`
    ///
    /// # Returns
    /// * Masks the size of `image`, best match first. An empty list means
    ///   nothing was found and is not an error.
    fn segment(&mut self, image: &RgbaImage, prompt: Prompt) -> Result<Vec<Segment>, SegmentationError>;

    /// Reset internal state
    ///
    /// Called when the editing session is cleared.
    fn reset_state(&mut self) {
        // Default implementation: no-op for stateless models
    }

    /// Short name for logs
    fn name(&self) -> &'static str;
}
