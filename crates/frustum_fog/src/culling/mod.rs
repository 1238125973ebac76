//! Visibility culling
//!
//! Provides the bounding-sphere culler that every object category runs once
//! per frame, and the accelerator seam it queries.

mod accelerator;
mod bounding_sphere;
mod culler;

pub use accelerator::{CullingAccelerator, SphereCullingGroup};
pub use bounding_sphere::{BoundingSphere, CullingView};
pub use culler::{Cullable, Shared, VisibilityCuller};
