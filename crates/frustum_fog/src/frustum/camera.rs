//! Per-frame camera input

use crate::culling::CullingView;
use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::gpu::TextureHandle;

/// The camera the grid is laid over this frame
#[derive(Debug, Clone, PartialEq)]
pub struct CameraView {
    /// World position
    pub position: Vec3,
    /// View-projection matrix
    pub world_to_clip: Mat4,
    /// Near plane distance
    pub near: f32,
    /// Camera depth buffer, required for occlusion culling
    pub depth_texture: Option<TextureHandle>,
}

impl CameraView {
    /// Create a view from a position and a world-to-clip matrix
    pub const fn new(position: Vec3, world_to_clip: Mat4, near: f32) -> Self {
        Self { position, world_to_clip, near, depth_texture: None }
    }

    /// Right-handed perspective camera looking at `target`
    pub fn perspective(position: Vec3, target: Vec3, up: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let view = Mat4::look_at_rh(&Point3::from(position), &Point3::from(target), &up);
        let projection = Mat4::new_perspective(aspect, fov_y, near, far);
        Self::new(position, projection * view, near)
    }

    /// Attach the camera depth buffer
    pub const fn with_depth_texture(mut self, depth_texture: TextureHandle) -> Self {
        self.depth_texture = Some(depth_texture);
        self
    }

    /// Inverse of the world-to-clip matrix
    pub fn clip_to_world(&self) -> Mat4 {
        self.world_to_clip.try_inverse().unwrap_or_else(|| {
            log::warn!("CameraView: world-to-clip matrix is singular");
            Mat4::identity()
        })
    }

    /// Culling view with the far plane replaced by `cutoff_distance`
    pub fn culling_view(&self, cutoff_distance: f32) -> CullingView {
        CullingView::from_world_to_clip(self.position, &self.world_to_clip, cutoff_distance)
    }
}

/// Everything the pipeline consumes for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    /// Active camera
    pub camera: CameraView,
    /// Animation time in seconds
    pub time: f32,
}

impl FrameInput {
    /// Create a frame input
    pub const fn new(camera: CameraView, time: f32) -> Self {
        Self { camera, time }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::BoundingSphere;
    use approx::assert_relative_eq;

    fn camera() -> CameraView {
        CameraView::perspective(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0), Vec3::y(), 1.0, 1.5, 0.1, 100.0)
    }

    #[test]
    fn test_clip_to_world_inverts() {
        let camera = camera();
        let product = camera.world_to_clip * camera.clip_to_world();
        assert_relative_eq!(product, Mat4::identity(), epsilon = 1e-4);
    }

    #[test]
    fn test_culling_view_uses_cutoff() {
        let view = camera().culling_view(20.0);
        assert!(view.contains(&BoundingSphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0)));
        assert!(!view.contains(&BoundingSphere::new(Vec3::new(0.0, 0.0, -50.0), 1.0)));
        assert!(!view.contains(&BoundingSphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0)));
    }
}
