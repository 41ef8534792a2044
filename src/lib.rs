//! Click-to-select recoloring of parts in a furniture photo.
//!
//! A click grows a region of similar color into a [`Mask`], each mask becomes a
//! [`Layer`] with its own color and opacity, and the [`compositor`] paints the
//! layers in order over the untouched base image with a brightness-preserving
//! tint, for previews and full-resolution exports alike.

pub mod color;
pub mod compositor;
pub mod export;
pub mod layers;
pub mod mask;
pub mod project;
pub mod segmentation;
pub mod selection;
pub mod session;
pub mod source;

pub use color::Color;
pub use compositor::{composite, BlendMode};
pub use layers::{Layer, LayerId, LayerStack};
pub use mask::Mask;
pub use selection::{grow, Seed, SelectionConfig};
pub use session::Session;
