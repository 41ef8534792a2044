use crate::color::Color;
use crate::compositor::BlendMode;
use crate::layers::{Layer, LayerId};
use crate::mask::BoundingBox;
use crate::selection::Seed;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stored form of one layer. The mask lives in its own PNG next to the
/// manifest so each part can be reloaded independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRecord {
    pub id: LayerId,
    /// Mask image path, relative to the manifest
    pub mask: PathBuf,
    /// `None` for masks from automatic segmentation
    pub click_x: Option<u32>,
    pub click_y: Option<u32>,
    pub fill_hex: Color,
    pub opacity: f32,
    #[serde(default)]
    pub blend_mode: BlendMode,
    pub bounding_box: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<u32>,
}

impl LayerRecord {
    pub fn from_layer(layer: &Layer, mask: PathBuf) -> Self {
        let seed = layer.seed();
        Self {
            id: layer.id(),
            mask,
            click_x: seed.map(|s| s.x),
            click_y: seed.map(|s| s.y),
            fill_hex: layer.color(),
            opacity: layer.opacity(),
            blend_mode: layer.blend(),
            bounding_box: layer.mask().bounding_box().unwrap_or_default(),
            part_label: layer.label().map(str::to_string),
            confidence: layer.confidence(),
            area: Some(layer.mask().area()),
        }
    }

    pub fn seed(&self) -> Option<Seed> {
        match (self.click_x, self.click_y) {
            (Some(x), Some(y)) => Some(Seed::new(x, y)),
            _ => None,
        }
    }
}

/// A saved project: base image plus its layers in paint order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    /// Base image path, relative to the manifest unless absolute
    pub image: PathBuf,
    pub width: u32,
    pub height: u32,
    pub layers: Vec<LayerRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_shape() {
        let json = r##"{
            "id": "6f1c2a4e-8d0b-4f5e-9a3c-1b2d3e4f5a6b",
            "mask": "masks/seat.png",
            "clickX": 12,
            "clickY": null,
            "fillHex": "#b76e79",
            "opacity": 0.8,
            "boundingBox": {"x": 1, "y": 2, "width": 3, "height": 4}
        }"##;
        let record: LayerRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.fill_hex, Color::new(0xB7, 0x6E, 0x79));
        assert_eq!(record.blend_mode, BlendMode::Multiply);
        assert_eq!(record.seed(), None);
        assert_eq!(record.part_label, None);

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["fillHex"], "#B76E79");
        assert_eq!(out["blendMode"], "multiply");
        assert!(out.get("partLabel").is_none());
    }
}
