mod external;
mod flood;
pub mod types;

pub use external::ExternalMasks;
pub use flood::FloodFill;
pub use types::{Prompt, Segment, SegmentationError, SegmentationModel};

use crate::selection::SelectionConfig;

/// Create the default segmentation model (flood fill)
pub fn create_default_model(config: SelectionConfig) -> Box<dyn SegmentationModel> {
    Box::new(FloodFill::new(config))
}
