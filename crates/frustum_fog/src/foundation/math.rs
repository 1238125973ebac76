//! Math utilities and types
//!
//! Provides the nalgebra aliases used across the crate and conversions into
//! the plain array layouts that GPU records carry.

pub use nalgebra::{Matrix4, Unit, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Convert a matrix into column-major arrays, the layout kernels read
pub fn mat4_to_array(matrix: &Mat4) -> [[f32; 4]; 4] {
    (*matrix).into()
}

/// Convert a vector into a plain array
pub fn vec3_to_array(vector: &Vec3) -> [f32; 3] {
    [vector.x, vector.y, vector.z]
}

/// Convert a vector into a plain array
pub fn vec4_to_array(vector: &Vec4) -> [f32; 4] {
    [vector.x, vector.y, vector.z, vector.w]
}
