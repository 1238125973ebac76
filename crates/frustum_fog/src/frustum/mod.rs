//! The frustum-aligned grid
//!
//! [`Frustum`] owns the lighting, fog and occlusion volumes laid over the
//! camera frustum and runs the per-frame sequence of category updates,
//! feature resolution and kernel dispatches.

mod camera;
mod pipeline;
mod resolution;


pub use camera::{CameraView, FrameInput};
pub use pipeline::{FrameReport, Frustum, OCCLUSION_FORMAT, UNWRITTEN_CELL, VOLUME_FORMAT};
pub use resolution::{GridResolution, SnapPolicy};
