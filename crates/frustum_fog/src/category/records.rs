//! GPU parameter records
//!
//! Byte layouts read by the main kernel. Every field is four bytes wide so
//! `#[repr(C)]` never inserts padding; vectors are plain float arrays and
//! matrices are column-major. An index of `-1` means "absent" and is never
//! treated as layer 0.

use bytemuck::{Pod, Zeroable};

/// Column-major identity matrix
pub const IDENTITY: [[f32; 4]; 4] = [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0], [0.0, 0.0, 0.0, 1.0]];

/// Index value meaning "no texture"
pub const NO_INDEX: i32 = -1;

/// Directional light record
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightParameters {
    /// Linear color times intensity
    pub color: [f32; 3],
    /// Light position, used as the cookie projection origin
    pub position: [f32; 3],
    /// Normalized light direction
    pub direction: [f32; 3],
    /// World to light space
    pub world_to_light: [[f32; 4]; 4],
    /// Light to world space
    pub light_to_world: [[f32; 4]; 4],
    /// Shadow map layer, `-1` when absent
    pub shadow_index: i32,
    /// Cookie map layer, `-1` when absent
    pub cookie_index: i32,
    /// Cookie tiling size
    pub cookie_params: [f32; 2],
    /// Whether the out-of-phase color is used
    pub out_of_phase_enabled: i32,
    /// Color for light scattered away from the view direction
    pub out_of_phase_color: [f32; 3],
}

impl Default for DirectionalLightParameters {
    fn default() -> Self {
        Self {
            color: [1.0; 3],
            position: [0.0; 3],
            direction: [0.0, -1.0, 0.0],
            world_to_light: IDENTITY,
            light_to_world: IDENTITY,
            shadow_index: NO_INDEX,
            cookie_index: NO_INDEX,
            cookie_params: [1.0, 1.0],
            out_of_phase_enabled: 0,
            out_of_phase_color: [0.0; 3],
        }
    }
}

/// Spot light record
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpotLightParameters {
    /// Linear color times intensity
    pub color: [f32; 3],
    /// Light position
    pub position: [f32; 3],
    /// Normalized cone axis
    pub direction: [f32; 3],
    /// Light range
    pub range: f32,
    /// Cosine of the cone half angle
    pub cos_half_angle: f32,
    /// Angular falloff (threshold, exponent)
    pub angular_falloff: [f32; 2],
    /// Distance falloff (threshold, exponent)
    pub distance_falloff: [f32; 2],
    /// World to shadow map space
    pub world_to_shadow: [[f32; 4]; 4],
    /// Shadow map layer, `-1` when absent
    pub shadow_index: i32,
    /// Shadow attenuation
    pub shadow_strength: f32,
    /// Cookie map layer, `-1` when absent
    pub cookie_index: i32,
    /// Cookie projection (scale, bias, angle)
    pub cookie_params: [f32; 3],
}

impl Default for SpotLightParameters {
    fn default() -> Self {
        Self {
            color: [1.0; 3],
            position: [0.0; 3],
            direction: [0.0, 0.0, 1.0],
            range: 10.0,
            cos_half_angle: 0.5,
            angular_falloff: [0.25, 1.0],
            distance_falloff: [0.5, 1.0],
            world_to_shadow: IDENTITY,
            shadow_index: NO_INDEX,
            shadow_strength: 1.0,
            cookie_index: NO_INDEX,
            cookie_params: [1.0, 0.0, 0.0],
        }
    }
}

/// Point light record
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightParameters {
    /// Linear color times intensity
    pub color: [f32; 3],
    /// Light position
    pub position: [f32; 3],
    /// Light range
    pub range: f32,
    /// Distance falloff (threshold, exponent)
    pub distance_falloff: [f32; 2],
    /// World to shadow map space
    pub world_to_shadow: [[f32; 4]; 4],
    /// Shadow depth projection (near, far)
    pub projection_params: [f32; 2],
    /// Shadow map layer, `-1` when absent
    pub shadow_index: i32,
    /// Shadow attenuation
    pub shadow_strength: f32,
    /// Cookie map layer, `-1` when absent
    pub cookie_index: i32,
    /// Cookie projection (yaw, pitch, roll)
    pub cookie_params: [f32; 3],
}

impl Default for PointLightParameters {
    fn default() -> Self {
        Self {
            color: [1.0; 3],
            position: [0.0; 3],
            range: 10.0,
            distance_falloff: [0.5, 1.0],
            world_to_shadow: IDENTITY,
            projection_params: [0.1, 10.0],
            shadow_index: NO_INDEX,
            shadow_strength: 1.0,
            cookie_index: NO_INDEX,
            cookie_params: [0.0; 3],
        }
    }
}

/// Volume shapes understood by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum VolumeShape {
    /// Unbounded, fills the whole frustum
    Global = 0,
    /// Unit cube
    Box = 1,
    /// Unit sphere
    Sphere = 2,
    /// Unit cylinder along y
    Cylinder = 3,
    /// Unit cone along y
    Cone = 4,
}

/// Remapping applied to a mask sample before it modulates an injection
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LevelsBlock {
    /// Contrast around the mid point
    pub contrast: f32,
    /// Input black point
    pub lower_input: f32,
    /// Input white point
    pub upper_input: f32,
    /// Output black point
    pub lower_output: f32,
    /// Output white point
    pub upper_output: f32,
}

impl Default for LevelsBlock {
    fn default() -> Self {
        Self { contrast: 0.0, lower_input: 0.0, upper_input: 1.0, lower_output: 0.0, upper_output: 1.0 }
    }
}

/// 3D texture mask sampling
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextureMaskBlock {
    /// Volume to mask space
    pub transform: [[f32; 4]; 4],
    /// Slab in the composed mask atlas, `-1` when absent
    pub index: i32,
    /// Wrap mode (0 clamp, 1 repeat, 2 mirror)
    pub wrap_mode: i32,
    /// Filter mode (0 point, 1 trilinear)
    pub filter_mode: i32,
    /// Whether alpha below the threshold clips the volume
    pub clip_on_alpha: i32,
    /// Alpha clipping threshold
    pub clipping_threshold: f32,
}

impl Default for TextureMaskBlock {
    fn default() -> Self {
        Self { transform: IDENTITY, index: NO_INDEX, wrap_mode: 0, filter_mode: 1, clip_on_alpha: 0, clipping_threshold: 0.5 }
    }
}

/// Procedural noise mask
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct NoiseMaskBlock {
    /// Volume to noise space
    pub transform: [[f32; 4]; 4],
    /// Whether the noise mask is evaluated
    pub enabled: i32,
    /// Scroll speed along the noise space w axis
    pub speed: f32,
}

impl Default for NoiseMaskBlock {
    fn default() -> Self {
        Self { transform: IDENTITY, enabled: 0, speed: 0.0 }
    }
}

/// Scalar injection (density, scattering)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ScalarInjection {
    /// Whether the injection applies
    pub enabled: i32,
    /// Injected value
    pub value: f32,
    /// Levels applied to the texture mask sample
    pub texture_mask_levels: LevelsBlock,
    /// Levels applied to the noise mask sample
    pub noise_mask_levels: LevelsBlock,
}

/// Color injection
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ColorInjection {
    /// Whether the injection applies
    pub enabled: i32,
    /// Injected linear color
    pub value: [f32; 3],
    /// Levels applied to the texture mask sample
    pub texture_mask_levels: LevelsBlock,
    /// Levels applied to the noise mask sample
    pub noise_mask_levels: LevelsBlock,
}

/// Density volume record
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VolumeParameters {
    /// World to unit volume space
    pub transform: [[f32; 4]; 4],
    /// [`VolumeShape`] discriminant
    pub shape: i32,
    /// Exponent applied to the border fades
    pub falloff_exponent: f32,
    /// Fade width on +x
    pub x_positive_fade: f32,
    /// Fade width on -x
    pub x_negative_fade: f32,
    /// Fade width on +y
    pub y_positive_fade: f32,
    /// Fade width on -y
    pub y_negative_fade: f32,
    /// Fade width on +z
    pub z_positive_fade: f32,
    /// Fade width on -z
    pub z_negative_fade: f32,
    /// 3D texture mask
    pub texture_mask: TextureMaskBlock,
    /// Noise mask
    pub noise_mask: NoiseMaskBlock,
    /// Density injection
    pub density: ScalarInjection,
    /// Scattering (anisotropy) injection
    pub scattering: ScalarInjection,
    /// Color injection
    pub color: ColorInjection,
}

impl VolumeParameters {
    /// Record for a shape with no fades, masks or injections
    pub fn with_shape(shape: VolumeShape) -> Self {
        Self {
            transform: IDENTITY,
            shape: shape as i32,
            falloff_exponent: 1.0,
            x_positive_fade: 0.0,
            x_negative_fade: 0.0,
            y_positive_fade: 0.0,
            y_negative_fade: 0.0,
            z_positive_fade: 0.0,
            z_negative_fade: 0.0,
            texture_mask: TextureMaskBlock::default(),
            noise_mask: NoiseMaskBlock::default(),
            density: ScalarInjection::default(),
            scattering: ScalarInjection::default(),
            color: ColorInjection::default(),
        }
    }
}

impl Default for VolumeParameters {
    fn default() -> Self {
        Self::with_shape(VolumeShape::Box)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_light_record_sizes() {
        assert_eq!(size_of::<DirectionalLightParameters>(), 49 * 4);
        assert_eq!(size_of::<SpotLightParameters>(), 37 * 4);
        assert_eq!(size_of::<PointLightParameters>(), 33 * 4);
    }

    #[test]
    fn test_volume_record_size() {
        assert_eq!(size_of::<LevelsBlock>(), 5 * 4);
        assert_eq!(size_of::<TextureMaskBlock>(), 21 * 4);
        assert_eq!(size_of::<NoiseMaskBlock>(), 18 * 4);
        assert_eq!(size_of::<ScalarInjection>(), 12 * 4);
        assert_eq!(size_of::<ColorInjection>(), 14 * 4);
        assert_eq!(size_of::<VolumeParameters>(), (16 + 8 + 21 + 18 + 12 + 12 + 14) * 4);
    }

    #[test]
    fn test_field_offsets_follow_declaration_order() {
        assert_eq!(offset_of!(DirectionalLightParameters, world_to_light), 36);
        assert_eq!(offset_of!(DirectionalLightParameters, shadow_index), 164);
        assert_eq!(offset_of!(SpotLightParameters, world_to_shadow), 60);
        assert_eq!(offset_of!(PointLightParameters, shadow_index), 108);
        assert_eq!(offset_of!(VolumeParameters, texture_mask), 96);
    }

    #[test]
    fn test_defaults_mark_textures_absent() {
        assert_eq!(DirectionalLightParameters::default().shadow_index, NO_INDEX);
        assert_eq!(SpotLightParameters::default().cookie_index, NO_INDEX);
        assert_eq!(PointLightParameters::default().shadow_index, NO_INDEX);
        assert_eq!(VolumeParameters::default().texture_mask.index, NO_INDEX);
    }

    #[test]
    fn test_shape_discriminant_is_stored() {
        assert_eq!(VolumeParameters::with_shape(VolumeShape::Sphere).shape, 2);
    }
}
