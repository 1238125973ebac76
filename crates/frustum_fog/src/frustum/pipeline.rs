//! Per-frame orchestration
//!
//! One [`Frustum::render_frame`] call runs, in order:
//!
//! 1. directional cascade configuration
//! 2. category updates (directional, spot, point, volumes)
//! 3. resolution check and volume (re)allocation
//! 4. feature flag resolution
//! 5. occlusion pass, when enabled
//! 6. main compute pass
//! 7. accumulation pass
//! 8. recording the world-to-clip matrix for next frame's reprojection
//!
//! Any dispatch failure is returned immediately and the remaining steps of
//! the frame are skipped. The next frame then runs without reprojection,
//! since the lighting history may already have been swapped and cleared.

use crate::category::{CategorySet, ShadowLayoutChanged, VisibleCounts};
use crate::config::{Config, FogSettings};
use crate::error::FogResult;
use crate::features::{FeatureFlagResolver, FeatureFlags, FeatureToggles, KernelVariant, RuntimeState, ShadowCascades};
use crate::foundation::math::{mat4_to_array, Mat4};
use crate::gpu::{
    names, release_texture_quietly, Bindings, Dispatch, DoubleBuffer, GpuBackend, GpuError, GpuResult, Kernel,
    TextureDescriptor, TextureFormat, TextureHandle,
};

use super::camera::FrameInput;
use super::resolution::GridResolution;

/// Clear value of unwritten lighting cells (density -10)
pub const UNWRITTEN_CELL: [f32; 4] = [0.0, 0.0, 0.0, -10.0];

/// Lighting and fog volume format
pub const VOLUME_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

/// Occlusion texture format
pub const OCCLUSION_FORMAT: TextureFormat = TextureFormat::R32Float;

/// Summary of one rendered frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Index of the frame, starting at 0
    pub frame: u64,
    /// Allocated grid resolution
    pub resolution: GridResolution,
    /// Resolved features
    pub flags: FeatureFlags,
    /// Main kernel variant
    pub variant: KernelVariant,
    /// Visible members per category
    pub visible: VisibleCounts,
    /// Dispatches issued
    pub dispatches: u32,
    /// Volume textures were (re)allocated this frame
    pub reallocated: bool,
    /// Cascade change applied this frame
    pub layout_changed: Option<ShadowLayoutChanged>,
}

struct VolumeTextures {
    resolution: GridResolution,
    lighting: DoubleBuffer<TextureHandle>,
    fog: TextureHandle,
    occlusion: DoubleBuffer<TextureHandle>,
}

impl VolumeTextures {
    fn allocate(backend: &mut dyn GpuBackend, resolution: GridResolution) -> GpuResult<Self> {
        let GridResolution { x, y, z } = resolution;
        let volume = TextureDescriptor::d3(x, y, z, VOLUME_FORMAT);
        let plane = TextureDescriptor::d2(x, y, OCCLUSION_FORMAT);
        let layout = [
            (volume, "LightingVolumeA"),
            (volume, "LightingVolumeB"),
            (volume, "FogVolume"),
            (plane, "OcclusionA"),
            (plane, "OcclusionB"),
        ];

        let mut created = Vec::with_capacity(layout.len());
        for (descriptor, label) in &layout {
            match backend.create_texture(descriptor, label) {
                Ok(handle) => created.push(handle),
                Err(error) => {
                    for handle in created {
                        release_texture_quietly(backend, handle);
                    }
                    return Err(error);
                }
            }
        }
        let [lighting_a, lighting_b, fog, occlusion_a, occlusion_b] = <[TextureHandle; 5]>::try_from(created)
            .map_err(|_| GpuError::AllocationFailed("volume textures".to_string()))?;

        Ok(Self {
            resolution,
            lighting: DoubleBuffer::new(lighting_a, lighting_b),
            fog,
            occlusion: DoubleBuffer::new(occlusion_a, occlusion_b),
        })
    }

    fn release(self, backend: &mut dyn GpuBackend) {
        let [lighting_a, lighting_b] = self.lighting.into_inner();
        let [occlusion_a, occlusion_b] = self.occlusion.into_inner();
        for handle in [lighting_a, lighting_b, self.fog, occlusion_a, occlusion_b] {
            release_texture_quietly(backend, handle);
        }
    }
}

/// Frustum-aligned volumetric fog pipeline
pub struct Frustum {
    settings: FogSettings,
    resolver: FeatureFlagResolver,
    textures: Option<VolumeTextures>,
    previous_world_to_clip: Option<Mat4>,
    history_valid: bool,
    frame: u64,
}

impl Frustum {
    /// Create a pipeline; nothing is allocated until the first frame
    pub fn new(settings: FogSettings) -> FogResult<Self> {
        settings.validate()?;
        Ok(Self {
            resolver: FeatureFlagResolver::new(settings.features),
            settings,
            textures: None,
            previous_world_to_clip: None,
            history_valid: false,
            frame: 0,
        })
    }

    /// Current settings
    pub const fn settings(&self) -> &FogSettings {
        &self.settings
    }

    /// Request a grid resolution; applied on the next frame
    pub fn set_resolution(&mut self, resolution: [u32; 3]) {
        self.settings.grid.resolution = resolution;
    }

    /// Replace the user toggles; applied on the next frame
    pub fn set_toggles(&mut self, toggles: FeatureToggles) {
        self.settings.features = toggles;
        self.resolver.set_toggles(toggles);
    }

    /// Request a cascade configuration; applied on the next frame
    pub fn set_cascades(&mut self, cascades: ShadowCascades) {
        self.settings.shadows.cascades = cascades;
    }

    /// Resolution the next allocation will use
    pub fn target_resolution(&self) -> GridResolution {
        let grid = &self.settings.grid;
        GridResolution::from_array(grid.resolution)
            .snap(grid.thread_group_size, grid.snap)
            .clamped_to_groups(grid.thread_group_size)
    }

    /// Allocated resolution, `None` before the first frame
    pub fn resolution(&self) -> Option<GridResolution> {
        self.textures.as_ref().map(|textures| textures.resolution)
    }

    /// Accumulated fog volume, consumed by the compositor
    pub fn fog_volume(&self) -> Option<TextureHandle> {
        self.textures.as_ref().map(|textures| textures.fog)
    }

    /// Lighting volume written by the last main pass
    pub fn lighting_volume(&self) -> Option<TextureHandle> {
        self.textures.as_ref().map(|textures| *textures.lighting.write())
    }

    /// Occlusion texture produced by the last occlusion pass
    pub fn occlusion_texture(&self) -> Option<TextureHandle> {
        self.textures.as_ref().map(|textures| *textures.occlusion.read())
    }

    /// Frames rendered so far
    pub const fn frame_count(&self) -> u64 {
        self.frame
    }

    fn ensure_textures(&mut self, backend: &mut dyn GpuBackend) -> GpuResult<bool> {
        let target = self.target_resolution();
        if self.textures.as_ref().is_some_and(|textures| textures.resolution == target) {
            return Ok(false);
        }
        if let Some(old) = self.textures.take() {
            old.release(backend);
        }
        self.textures = Some(VolumeTextures::allocate(backend, target)?);
        self.history_valid = false;
        log::info!(
            "Frustum: allocated {}x{}x{} grid (requested {:?})",
            target.x,
            target.y,
            target.z,
            self.settings.grid.resolution
        );
        Ok(true)
    }

    /// Render one frame of volumetric fog
    pub fn render_frame(
        &mut self,
        backend: &mut dyn GpuBackend,
        categories: &mut CategorySet,
        input: &FrameInput,
    ) -> FogResult<FrameReport> {
        let layout_changed = categories.apply_cascades(backend, self.settings.shadows.cascades)?;

        let camera = &input.camera;
        let far = self.settings.far_distance;
        categories.update(backend, &camera.culling_view(far))?;

        let reallocated = self.ensure_textures(backend)?;

        let state = RuntimeState {
            has_depth_texture: camera.depth_texture.is_some(),
            has_history: self.history_valid && self.previous_world_to_clip.is_some(),
            ..categories.runtime_state()
        };
        let flags = self.resolver.resolve(&state);
        let variant = flags.kernel_variant();
        // History stays invalid until this frame completes
        self.history_valid = false;

        let group_size = self.settings.grid.thread_group_size;
        let Some(textures) = self.textures.as_mut() else {
            return Err(GpuError::AllocationFailed("volume textures".to_string()).into());
        };
        let resolution = textures.resolution;
        let groups = resolution.thread_groups(group_size);
        let plane_groups = [groups[0], groups[1], 1];
        let mut dispatches = 0;

        let occlusion = flags.contains(FeatureFlags::OCCLUSION);
        if let (true, Some(depth)) = (occlusion, camera.depth_texture) {
            let mut bindings = Bindings::new();
            bindings
                .texture(names::CAMERA_DEPTH, depth)
                .storage_texture(names::OCCLUSION_OUTPUT, *textures.occlusion.write())
                .vec4(names::RESOLUTION, resolution.as_vec4());
            backend.dispatch(&Dispatch::new(Kernel::OcclusionDepth, bindings, plane_groups))?;
            textures.occlusion.swap();

            let mut bindings = Bindings::new();
            bindings
                .texture(names::OCCLUSION_INPUT, *textures.occlusion.read())
                .storage_texture(names::OCCLUSION_OUTPUT, *textures.occlusion.write())
                .vec4(names::RESOLUTION, resolution.as_vec4());
            backend.dispatch(&Dispatch::new(Kernel::OcclusionFilter, bindings, plane_groups))?;
            textures.occlusion.swap();

            backend.clear_texture(textures.fog, [0.0; 4])?;
            dispatches += 2;
        }

        textures.lighting.swap();
        backend.clear_texture(*textures.lighting.write(), UNWRITTEN_CELL)?;

        let layer_depth = (far - camera.near) / resolution.z as f32;
        let world_to_clip = camera.world_to_clip;
        let mut bindings = Bindings::new();
        bindings
            .storage_texture(names::LIGHTING_VOLUME, *textures.lighting.write())
            .vec4(names::CAMERA_POSITION, [camera.position.x, camera.position.y, camera.position.z, 1.0])
            .vec4(names::CAMERA_RANGES, [camera.near, far, layer_depth, 0.0])
            .mat4(names::WORLD_TO_CLIP, mat4_to_array(&world_to_clip))
            .mat4(names::CLIP_TO_WORLD, mat4_to_array(&camera.clip_to_world()))
            .vec4(names::RESOLUTION, resolution.as_vec4())
            .float(names::TIME, input.time);
        if let (true, Some(previous)) = (flags.contains(FeatureFlags::REPROJECTION), self.previous_world_to_clip) {
            bindings
                .texture(names::PREVIOUS_LIGHTING_VOLUME, *textures.lighting.read())
                .mat4(names::PREVIOUS_WORLD_TO_CLIP, mat4_to_array(&previous));
        }
        if occlusion {
            bindings.texture(names::OCCLUSION_INPUT, *textures.occlusion.read());
        }
        categories.bind(flags, &mut bindings);
        backend.dispatch(&Dispatch::new(Kernel::ComputeData, bindings, groups).with_variant(variant))?;
        dispatches += 1;

        let mut bindings = Bindings::new();
        bindings
            .texture(names::LIGHTING_VOLUME_INPUT, *textures.lighting.write())
            .storage_texture(names::FOG_VOLUME, textures.fog)
            .float(names::NORMALIZATION, -layer_depth)
            .vec4(names::RESOLUTION, resolution.as_vec4());
        if occlusion {
            bindings.texture(names::OCCLUSION_INPUT, *textures.occlusion.read());
        }
        backend.dispatch(&Dispatch::new(Kernel::Accumulation { occlusion }, bindings, plane_groups))?;
        dispatches += 1;

        self.previous_world_to_clip = Some(world_to_clip);
        self.history_valid = true;

        let report = FrameReport {
            frame: self.frame,
            resolution,
            flags,
            variant,
            visible: categories.visible_counts(),
            dispatches,
            reallocated,
            layout_changed,
        };
        self.frame += 1;
        log::trace!("Frustum: {:?}", report);
        Ok(report)
    }

    /// Release every volume texture; the next frame reallocates
    pub fn release(&mut self, backend: &mut dyn GpuBackend) {
        if let Some(textures) = self.textures.take() {
            textures.release(backend);
            log::debug!("Frustum: released volume textures");
        }
        self.previous_world_to_clip = None;
        self.history_valid = false;
    }
}
