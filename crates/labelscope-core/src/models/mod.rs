pub mod annotation;
pub mod mask;
pub mod server_info;

pub use annotation::{PointAnnotation, Segment};
pub use mask::{MaskBuffer, SegmentDescriptor, SegmentationMask};
pub use server_info::{LabelSet, ModelInfo, ModelType, ServerInfo};
