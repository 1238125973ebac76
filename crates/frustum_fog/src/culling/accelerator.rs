//! Spatial-query accelerator seam
//!
//! The culler mirrors its registry into a flat sphere array and hands it to an
//! accelerator in one query per frame. Swapping the accelerator (grid, BVH,
//! GPU culling group) does not change the culler.

use super::bounding_sphere::{BoundingSphere, CullingView};

/// Accelerator answering "which of these spheres are visible"
pub trait CullingAccelerator {
    /// Resize internal state to `count` spheres; called whenever the registry size changes
    fn resize(&mut self, count: usize);

    /// Number of spheres the accelerator is currently sized for
    fn capacity(&self) -> usize;

    /// Write the indices of visible spheres, ascending, into `visible`
    fn query(&mut self, spheres: &[BoundingSphere], view: &CullingView, visible: &mut Vec<usize>);

    /// Release internal state
    fn release(&mut self);
}

/// Brute-force accelerator testing every sphere against the view
///
/// Keeps the per-sphere distance from the reference point of the last query.
#[derive(Debug, Default)]
pub struct SphereCullingGroup {
    distances: Vec<f32>,
}

impl SphereCullingGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Distance from the reference point to each sphere surface, last query
    pub fn distances(&self) -> &[f32] {
        &self.distances
    }
}

impl CullingAccelerator for SphereCullingGroup {
    fn resize(&mut self, count: usize) {
        self.distances.resize(count, f32::INFINITY);
    }

    fn capacity(&self) -> usize {
        self.distances.len()
    }

    fn query(&mut self, spheres: &[BoundingSphere], view: &CullingView, visible: &mut Vec<usize>) {
        debug_assert_eq!(spheres.len(), self.distances.len(), "accelerator out of sync with sphere array");
        visible.clear();
        for (index, (sphere, distance)) in spheres.iter().zip(self.distances.iter_mut()).enumerate() {
            *distance = if sphere.is_infinite() {
                0.0
            } else {
                ((sphere.position - view.reference_point).norm() - sphere.radius).max(0.0)
            };
            if view.contains(sphere) {
                visible.push(index);
            }
        }
    }

    fn release(&mut self) {
        self.distances = Vec::new();
    }
}
