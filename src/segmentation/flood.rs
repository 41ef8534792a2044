use super::types::{Prompt, Segment, SegmentationError, SegmentationModel};
use crate::mask;
use crate::selection::{self, SelectionConfig};
use image::RgbaImage;

/// Built-in tolerance flood fill, followed by majority smoothing when enabled.
pub struct FloodFill {
    config: SelectionConfig,
}

impl FloodFill {
    pub fn new(config: SelectionConfig) -> Self {
        tracing::debug!(
            "Flood fill tolerance {} (cutoff {:.1}), smoothing {}",
            config.tolerance,
            config.cutoff(),
            config.smooth
        );
        Self { config }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }
}

impl SegmentationModel for FloodFill {
    fn segment(&mut self, image: &RgbaImage, prompt: Prompt) -> Result<Vec<Segment>, SegmentationError> {
        let seed = match prompt {
            Prompt::Point(seed) => seed,
            Prompt::Everything => {
                return Err(SegmentationError::Unsupported {
                    model: self.name(),
                    prompt,
                })
            }
        };

        let raw = selection::grow(image, seed, &self.config)?;
        let mask = if self.config.smooth {
            mask::smooth(&raw)
        } else {
            raw
        };

        if mask.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Segment::from_mask(mask)])
    }

    fn name(&self) -> &'static str {
        "flood-fill"
    }
}
