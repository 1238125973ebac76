//! Kernel dispatch contract
//!
//! Each kernel entry point declares named inputs (textures, structured
//! buffers, scalars) and named outputs (storage textures). The orchestration
//! binds resources by name and picks the entry point; the kernels themselves
//! live outside this crate.

use super::backend::{BufferHandle, GpuError, GpuResult, TextureHandle};
use crate::features::KernelVariant;

/// Binding names shared with the kernels
pub mod names {
    /// Camera depth buffer consumed by the occlusion reduction
    pub const CAMERA_DEPTH: &str = "cameraDepthTexture";
    /// Occlusion texture written by the occlusion passes
    pub const OCCLUSION_OUTPUT: &str = "occlusionTexture";
    /// Occlusion texture read by the filter, main and accumulation passes
    pub const OCCLUSION_INPUT: &str = "occlusionInputTexture";
    /// Lighting volume written by the main pass
    pub const LIGHTING_VOLUME: &str = "lightingVolume";
    /// Previous frame lighting volume read for reprojection
    pub const PREVIOUS_LIGHTING_VOLUME: &str = "previousLightingVolume";
    /// Lighting volume read by the accumulation pass
    pub const LIGHTING_VOLUME_INPUT: &str = "lightingVolumeInput";
    /// Fog volume written by the accumulation pass
    pub const FOG_VOLUME: &str = "fogVolume";
    /// Accumulation normalization derived from the grid layer depth
    pub const NORMALIZATION: &str = "normalizationCoefficient";
    /// Grid resolution (xyz, w = 1 / z)
    pub const RESOLUTION: &str = "resolution";
    /// Camera world position
    pub const CAMERA_POSITION: &str = "cameraPosition";
    /// Camera ranges (near, far, layer depth, unused)
    pub const CAMERA_RANGES: &str = "cameraRanges";
    /// Current world-to-clip matrix
    pub const WORLD_TO_CLIP: &str = "worldToClip";
    /// Current clip-to-world matrix
    pub const CLIP_TO_WORLD: &str = "clipToWorld";
    /// Previous frame world-to-clip matrix
    pub const PREVIOUS_WORLD_TO_CLIP: &str = "previousWorldToClip";
    /// Animation time in seconds
    pub const TIME: &str = "time";

    /// Directional light records
    pub const DIRECTIONAL_LIGHTS_BUFFER: &str = "directionalLightsDataBuffer";
    /// Directional light record count
    pub const DIRECTIONAL_LIGHTS_COUNT: &str = "directionalLightsCount";
    /// Directional shadow map array
    pub const DIRECTIONAL_SHADOW_MAPS: &str = "directionalShadowMapsArray";
    /// Directional cascade shadow data array
    pub const DIRECTIONAL_SHADOW_DATA: &str = "directionalShadowDataArray";
    /// Directional cookie map array
    pub const DIRECTIONAL_COOKIE_MAPS: &str = "directionalCookieMapsArray";

    /// Spot light records
    pub const SPOT_LIGHTS_BUFFER: &str = "spotLightsDataBuffer";
    /// Spot light record count
    pub const SPOT_LIGHTS_COUNT: &str = "spotLightsCount";
    /// Spot shadow map array
    pub const SPOT_SHADOW_MAPS: &str = "spotShadowMapsArray";
    /// Spot cookie map array
    pub const SPOT_COOKIE_MAPS: &str = "spotCookieMapsArray";

    /// Point light records
    pub const POINT_LIGHTS_BUFFER: &str = "pointLightsDataBuffer";
    /// Point light record count
    pub const POINT_LIGHTS_COUNT: &str = "pointLightsCount";
    /// Point shadow map array
    pub const POINT_SHADOW_MAPS: &str = "pointShadowMapsArray";
    /// Point cookie map array
    pub const POINT_COOKIE_MAPS: &str = "pointCookieMapsArray";

    /// Volume records
    pub const VOLUMES_BUFFER: &str = "volumesDataBuffer";
    /// Volume record count
    pub const VOLUMES_COUNT: &str = "volumesCount";
    /// Composed 3D volume mask atlas
    pub const VOLUME_MASKS: &str = "volumeMaskTexture";
}

/// Kernel entry point families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Max-depth reduction of the camera depth buffer
    OcclusionDepth,
    /// Format and filter pass over the reduced occlusion texture
    OcclusionFilter,
    /// Per-cell density, lighting and reprojection
    ComputeData,
    /// Integration of the lighting volume along view depth
    Accumulation {
        /// Whether the occlusion-aware entry point is used
        occlusion: bool,
    },
}

impl Kernel {
    /// Entry point name of the kernel family
    pub const fn name(self) -> &'static str {
        match self {
            Self::OcclusionDepth => "ComputeMaxDepth",
            Self::OcclusionFilter => "FilterOcclusion",
            Self::ComputeData => "ComputeData",
            Self::Accumulation { occlusion: false } => "Accumulate",
            Self::Accumulation { occlusion: true } => "AccumulateOccluded",
        }
    }

    /// Bindings every entry point of this family must receive
    pub const fn required_bindings(self) -> &'static [&'static str] {
        match self {
            Self::OcclusionDepth => &[names::CAMERA_DEPTH, names::OCCLUSION_OUTPUT, names::RESOLUTION],
            Self::OcclusionFilter => &[names::OCCLUSION_INPUT, names::OCCLUSION_OUTPUT, names::RESOLUTION],
            Self::ComputeData => &[
                names::LIGHTING_VOLUME,
                names::CAMERA_POSITION,
                names::CAMERA_RANGES,
                names::WORLD_TO_CLIP,
                names::CLIP_TO_WORLD,
                names::RESOLUTION,
                names::TIME,
            ],
            Self::Accumulation { occlusion: false } => &[
                names::LIGHTING_VOLUME_INPUT,
                names::FOG_VOLUME,
                names::NORMALIZATION,
                names::RESOLUTION,
            ],
            Self::Accumulation { occlusion: true } => &[
                names::LIGHTING_VOLUME_INPUT,
                names::FOG_VOLUME,
                names::NORMALIZATION,
                names::RESOLUTION,
                names::OCCLUSION_INPUT,
            ],
        }
    }
}

/// A resource or value bound to a kernel name
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binding {
    /// Read-only texture input
    Texture(TextureHandle),
    /// Read/write texture output
    StorageTexture(TextureHandle),
    /// Structured buffer input
    Buffer(BufferHandle),
    /// Integer scalar
    Int(i32),
    /// Float scalar
    Float(f32),
    /// Four component vector
    Vec4([f32; 4]),
    /// Column-major 4x4 matrix
    Mat4([[f32; 4]; 4]),
}

/// Ordered set of named bindings for one dispatch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(&'static str, Binding)>,
}

impl Bindings {
    /// Create an empty binding set
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value, replacing any previous binding of the same name
    pub fn set(&mut self, name: &'static str, binding: Binding) -> &mut Self {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = binding;
        } else {
            self.entries.push((name, binding));
        }
        self
    }

    /// Bind a read-only texture
    pub fn texture(&mut self, name: &'static str, handle: TextureHandle) -> &mut Self {
        self.set(name, Binding::Texture(handle))
    }

    /// Bind a read/write texture
    pub fn storage_texture(&mut self, name: &'static str, handle: TextureHandle) -> &mut Self {
        self.set(name, Binding::StorageTexture(handle))
    }

    /// Bind a structured buffer
    pub fn buffer(&mut self, name: &'static str, handle: BufferHandle) -> &mut Self {
        self.set(name, Binding::Buffer(handle))
    }

    /// Bind an integer
    pub fn int(&mut self, name: &'static str, value: i32) -> &mut Self {
        self.set(name, Binding::Int(value))
    }

    /// Bind a float
    pub fn float(&mut self, name: &'static str, value: f32) -> &mut Self {
        self.set(name, Binding::Float(value))
    }

    /// Bind a vector
    pub fn vec4(&mut self, name: &'static str, value: [f32; 4]) -> &mut Self {
        self.set(name, Binding::Vec4(value))
    }

    /// Bind a matrix
    pub fn mat4(&mut self, name: &'static str, value: [[f32; 4]; 4]) -> &mut Self {
        self.set(name, Binding::Mat4(value))
    }

    /// Look up a binding by name
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, b)| b)
    }

    /// Whether a name is bound
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate bindings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Binding)> {
        self.entries.iter().map(|(n, b)| (*n, b))
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fail if a texture is bound both as an input and as an output
    pub fn check_hazards(&self) -> GpuResult<()> {
        for (output, binding) in self.iter() {
            let Binding::StorageTexture(written) = binding else {
                continue;
            };
            let aliased = self.iter().find(|(_, b)| matches!(b, Binding::Texture(read) if read == written));
            if let Some((input, _)) = aliased {
                return Err(GpuError::ReadWriteHazard { input, output });
            }
        }
        Ok(())
    }
}

/// One kernel dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Kernel family
    pub kernel: Kernel,
    /// Compiled variant within the family (feature flag identifier)
    pub variant: KernelVariant,
    /// Named resources
    pub bindings: Bindings,
    /// Thread group counts
    pub groups: [u32; 3],
}

impl Dispatch {
    /// Create a dispatch for the base variant of a kernel
    pub fn new(kernel: Kernel, bindings: Bindings, groups: [u32; 3]) -> Self {
        Self { kernel, variant: KernelVariant::BASE, bindings, groups }
    }

    /// Select a compiled variant
    pub fn with_variant(mut self, variant: KernelVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Full entry point name, including the variant suffix
    pub fn entry_point_name(&self) -> String {
        if self.variant == KernelVariant::BASE {
            self.kernel.name().to_string()
        } else {
            self.variant.entry_point_name(self.kernel.name())
        }
    }

    /// Names the chosen entry point must receive, including flag-gated ones
    pub fn required_bindings(&self) -> Vec<&'static str> {
        let mut required = self.kernel.required_bindings().to_vec();
        if self.kernel == Kernel::ComputeData {
            required.extend(self.variant.required_bindings());
        }
        required
    }

    /// Check the dispatch against its declared contract
    pub fn validate(&self) -> GpuResult<()> {
        for name in self.required_bindings() {
            if !self.bindings.contains(name) {
                return Err(GpuError::MissingBinding { kernel: self.kernel, name });
            }
        }
        self.bindings.check_hazards()
    }
}
