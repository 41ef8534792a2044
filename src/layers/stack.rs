use super::{check_opacity, Layer, LayerId, StackError};
use crate::color::Color;
use crate::mask::Mask;
use std::sync::{Arc, Mutex};

/// Stack shared between a UI thread and background selection workers.
pub type SharedStack = Arc<Mutex<LayerStack>>;

/// Ordered layers for one editing session.
///
/// Insertion order is paint order: later layers are composited over earlier
/// ones. Every mutation bumps `version`, which lets a slow selection detect
/// that the stack moved on while it was running.
#[derive(Debug, Clone)]
pub struct LayerStack {
    width: u32,
    height: u32,
    layers: Vec<Layer>,
    version: u64,
}

impl LayerStack {
    /// Empty stack for a canvas of the given source dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layers: Vec::new(),
            version: 0,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// Most recently appended layer.
    pub fn latest(&self) -> Option<&Layer> {
        self.layers.last()
    }

    /// Add a layer built from a fresh selection.
    pub fn append(&mut self, mask: Mask, color: Color, opacity: f32) -> Result<LayerId, StackError> {
        self.push(Layer::new(mask, color, opacity)?)
    }

    /// Add a prepared layer on top of the stack.
    pub fn push(&mut self, layer: Layer) -> Result<LayerId, StackError> {
        let found = layer.mask.dimensions();
        if found != (self.width, self.height) {
            return Err(StackError::DimensionMismatch {
                expected: (self.width, self.height),
                found,
            });
        }

        let id = layer.id;
        tracing::debug!("Appending layer {} ({} px, {})", id, layer.mask.area(), layer.color);
        self.layers.push(layer);
        self.version += 1;
        Ok(id)
    }

    /// Push only if nothing changed since `expected_version` was read.
    ///
    /// Returns `Ok(None)` for a stale result, which the caller drops.
    pub fn push_if_current(
        &mut self,
        expected_version: u64,
        layer: Layer,
    ) -> Result<Option<LayerId>, StackError> {
        if self.version != expected_version {
            tracing::debug!(
                "Discarding stale selection (version {} != {})",
                expected_version,
                self.version
            );
            return Ok(None);
        }
        self.push(layer).map(Some)
    }

    pub fn update_color(&mut self, id: LayerId, color: Color) -> Result<(), StackError> {
        self.layer_mut(id)?.color = color;
        self.version += 1;
        Ok(())
    }

    pub fn update_opacity(&mut self, id: LayerId, opacity: f32) -> Result<(), StackError> {
        check_opacity(opacity)?;
        self.layer_mut(id)?.opacity = opacity;
        self.version += 1;
        Ok(())
    }

    /// Drop every layer.
    pub fn reset(&mut self) {
        tracing::debug!("Clearing {} layers", self.layers.len());
        self.layers.clear();
        self.version += 1;
    }

    fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer, StackError> {
        self.layers
            .iter_mut()
            .find(|layer| layer.id == id)
            .ok_or(StackError::UnknownLayer(id))
    }
}
