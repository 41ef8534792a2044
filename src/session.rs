use crate::color::Color;
use crate::compositor::{self, CompositeError};
use crate::export::ExportScale;
use crate::layers::{Layer, LayerId, LayerStack, StackError};
use crate::segmentation::{self, Prompt, Segment, SegmentationError, SegmentationModel};
use crate::selection::{Seed, SelectionConfig, SelectionError};
use image::RgbaImage;

/// Opacity given to new layers when the caller has no preference.
pub const DEFAULT_OPACITY: f32 = 0.7;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Segmentation(#[from] SegmentationError),

    #[error(transparent)]
    Stack(#[from] StackError),
}

/// One editing session over a single base image.
///
/// Owns the base raster, the layer stack and the segmentation model. The base
/// image is never modified; every render starts again from it.
pub struct Session {
    base: RgbaImage,
    stack: LayerStack,
    model: Box<dyn SegmentationModel>,
}

impl Session {
    /// Session using the built-in flood fill.
    pub fn new(base: RgbaImage, config: SelectionConfig) -> Self {
        Self::with_model(base, segmentation::create_default_model(config))
    }

    pub fn with_model(base: RgbaImage, model: Box<dyn SegmentationModel>) -> Self {
        let (width, height) = base.dimensions();
        tracing::info!("New session {}x{} using {}", width, height, model.name());
        Self {
            base,
            stack: LayerStack::new(width, height),
            model,
        }
    }

    pub fn base(&self) -> &RgbaImage {
        &self.base
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    /// Best segment under `seed`, without adding a layer.
    pub fn select(&mut self, seed: Seed) -> Result<Segment, SessionError> {
        let (width, height) = self.base.dimensions();
        if !seed.in_bounds(width, height) {
            return Err(SelectionError::InvalidSeed {
                x: seed.x,
                y: seed.y,
                width,
                height,
            }
            .into());
        }

        let segment = self
            .model
            .segment(&self.base, Prompt::Point(seed))?
            .into_iter()
            .next()
            .filter(|segment| segment.mask.is_paintable())
            .ok_or(SelectionError::EmptySelection { x: seed.x, y: seed.y })?;

        tracing::debug!(
            "Selected {} px at ({}, {}) bounds {:?}",
            segment.area,
            seed.x,
            seed.y,
            segment.bounding_box
        );
        Ok(segment)
    }

    /// Select the part under `seed` and paint it as a new top layer.
    ///
    /// A click on background or a transparent pixel creates no layer.
    pub fn click(&mut self, seed: Seed, color: Color, opacity: f32) -> Result<LayerId, SessionError> {
        let segment = self.select(seed)?;

        let layer = Layer::new(segment.mask, color, opacity)?
            .with_seed(Some(seed))
            .with_label(segment.label, segment.confidence);
        let id = self.stack.push(layer)?;

        tracing::info!("Layer {} painted {} at ({}, {})", id, color, seed.x, seed.y);
        Ok(id)
    }

    /// Add every segment the model finds, all in one color.
    pub fn paint_all(&mut self, color: Color, opacity: f32) -> Result<Vec<LayerId>, SessionError> {
        let segments = self.model.segment(&self.base, Prompt::Everything)?;

        let mut ids = Vec::with_capacity(segments.len());
        for segment in segments {
            let layer = Layer::new(segment.mask, color, opacity)?
                .with_label(segment.label, segment.confidence);
            ids.push(self.stack.push(layer)?);
        }

        tracing::info!("Painted {} segments with {}", ids.len(), color);
        Ok(ids)
    }

    /// Add an already prepared layer, e.g. one replayed from storage.
    pub fn push_layer(&mut self, layer: Layer) -> Result<LayerId, SessionError> {
        Ok(self.stack.push(layer)?)
    }

    pub fn update_color(&mut self, id: LayerId, color: Color) -> Result<(), SessionError> {
        Ok(self.stack.update_color(id, color)?)
    }

    pub fn update_opacity(&mut self, id: LayerId, opacity: f32) -> Result<(), SessionError> {
        Ok(self.stack.update_opacity(id, opacity)?)
    }

    /// Change the active color: recolors the most recent layer, if any.
    pub fn set_active_color(&mut self, color: Color) -> Result<Option<LayerId>, SessionError> {
        let Some(id) = self.stack.latest().map(|layer| layer.id()) else {
            return Ok(None);
        };
        self.stack.update_color(id, color)?;
        Ok(Some(id))
    }

    /// Clear every layer and any model state.
    pub fn reset(&mut self) {
        tracing::info!("Resetting session ({} layers)", self.stack.len());
        self.stack.reset();
        self.model.reset_state();
    }

    /// Render the stack at an arbitrary display size.
    pub fn preview(&self, size: (u32, u32)) -> Result<RgbaImage, CompositeError> {
        compositor::composite(&self.base, self.stack.layers(), size)
    }

    /// Flattened render at a multiple of the source resolution.
    pub fn export(&self, scale: ExportScale) -> Result<RgbaImage, CompositeError> {
        let size = scale.apply(self.base.dimensions());
        tracing::info!("Exporting {} layers at {}x{}", self.stack.len(), size.0, size.1);
        compositor::composite(&self.base, self.stack.layers(), size)
    }
}
