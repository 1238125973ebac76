//! Bounding spheres and the culling view they are tested against

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// World-space bounding sphere refreshed by its owner every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Sphere center
    pub position: Vec3,
    /// Sphere radius; infinite for unbounded objects, negative for "never visible"
    pub radius: f32,
}

impl BoundingSphere {
    /// Create a sphere
    pub const fn new(position: Vec3, radius: f32) -> Self {
        Self { position, radius }
    }

    /// Sphere that passes every test (directional lights, global volumes)
    pub fn infinite() -> Self {
        Self::new(Vec3::zeros(), f32::INFINITY)
    }

    /// Sphere that fails every test (objects dropped without unregistering)
    pub fn culled() -> Self {
        Self::new(Vec3::zeros(), -1.0)
    }

    /// Whether this sphere bounds all of space
    pub fn is_infinite(&self) -> bool {
        self.radius.is_infinite() && self.radius > 0.0
    }
}

/// Camera-derived volume the culler tests spheres against
///
/// The frustum's far plane is replaced by `cutoff_distance`, measured from
/// `reference_point`.
#[derive(Debug, Clone, PartialEq)]
pub struct CullingView {
    /// Point distances are measured from (camera position)
    pub reference_point: Vec3,
    /// Normalized side and near planes, `n·p + d >= 0` inside
    pub planes: [Vec4; 5],
    /// Single global cutoff distance
    pub cutoff_distance: f32,
}

impl CullingView {
    /// Build a view from a world-to-clip matrix
    pub fn from_world_to_clip(reference_point: Vec3, world_to_clip: &Mat4, cutoff_distance: f32) -> Self {
        let row = |i: usize| -> Vec4 { world_to_clip.row(i).transpose() };
        let (x, y, z, w) = (row(0), row(1), row(2), row(3));
        let planes = [w + x, w - x, w + y, w - y, w + z].map(normalize_plane);
        Self { reference_point, planes, cutoff_distance }
    }

    /// Distance-only view, every direction accepted
    pub fn distance_only(reference_point: Vec3, cutoff_distance: f32) -> Self {
        Self {
            reference_point,
            planes: [Vec4::new(0.0, 0.0, 0.0, 1.0); 5],
            cutoff_distance,
        }
    }

    /// Test a sphere against the distance band and the frustum planes
    pub fn contains(&self, sphere: &BoundingSphere) -> bool {
        if sphere.radius < 0.0 || sphere.radius.is_nan() {
            return false;
        }
        if sphere.is_infinite() {
            return true;
        }
        if (sphere.position - self.reference_point).norm() - sphere.radius > self.cutoff_distance {
            return false;
        }
        self.planes.iter().all(|plane| {
            plane.x * sphere.position.x + plane.y * sphere.position.y + plane.z * sphere.position.z + plane.w
                >= -sphere.radius
        })
    }
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    let length = plane.xyz().norm();
    if length > f32::EPSILON {
        plane / length
    } else {
        plane
    }
}
