//! Segmentation state: entities, tool-group representations, color tables
//! and the store that owns them.

mod color;
mod registry;
mod segmentation;
mod store;

pub use color::{ColorLut, DEFAULT_LUT_SIZE, Rgba};
pub use registry::{RepresentationInput, RepresentationRegistry, ToolGroupRepresentation};
pub use segmentation::{
    ContourData, LabelmapData, RepresentationData, RepresentationType, Segmentation,
    SegmentationInput,
};
pub use store::{DEFAULT_COLOR_LUT_INDEX, SegmentationStateStore};
