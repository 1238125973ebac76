//! Dependency-ordered feature resolution
//!
//! Every flag is the AND of a user toggle, the runtime availability of its
//! data and its already-resolved parent. Parents are always resolved before
//! their dependents, so a combination like "spot shadows on, spot lights
//! off" cannot be produced.

use serde::{Deserialize, Serialize};

use super::flags::FeatureFlags;

/// Directional shadow cascade configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadowCascades {
    /// Single cascade
    One,
    /// Two cascades side by side
    Two,
    /// Four cascades in a 2x2 grid
    #[default]
    Four,
}

impl ShadowCascades {
    /// Number of cascades
    pub const fn count(self) -> u32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    /// Kernel variant bit selected by this configuration
    pub const fn flag(self) -> FeatureFlags {
        match self {
            Self::One => FeatureFlags::DIRECTIONAL_SHADOWS_ONE_CASCADE,
            Self::Two => FeatureFlags::DIRECTIONAL_SHADOWS_TWO_CASCADES,
            Self::Four => FeatureFlags::DIRECTIONAL_SHADOWS_FOUR_CASCADES,
        }
    }

    /// Directional shadow map extent for a per-cascade resolution
    pub const fn shadow_map_extent(self, resolution: u32) -> (u32, u32) {
        match self {
            Self::One => (resolution, resolution),
            Self::Two => (resolution * 2, resolution),
            Self::Four => (resolution * 2, resolution * 2),
        }
    }
}

/// User feature toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    /// Density volumes
    pub volumes: bool,
    /// 3D texture masks on volumes
    pub volume_texture_masks: bool,
    /// Procedural noise masks on volumes
    pub volume_noise_masks: bool,
    /// Directional lights
    pub directional_lights: bool,
    /// Directional light shadows
    pub directional_shadows: bool,
    /// Directional light cookies
    pub directional_cookies: bool,
    /// Spot lights
    pub spot_lights: bool,
    /// Spot light shadows
    pub spot_shadows: bool,
    /// Spot light cookies
    pub spot_cookies: bool,
    /// Point lights
    pub point_lights: bool,
    /// Point light shadows
    pub point_shadows: bool,
    /// Point light cookies
    pub point_cookies: bool,
    /// Per-cell occlusion culling
    pub occlusion_culling: bool,
    /// Temporal reprojection
    pub temporal_reprojection: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            volumes: true,
            volume_texture_masks: true,
            volume_noise_masks: true,
            directional_lights: true,
            directional_shadows: true,
            directional_cookies: true,
            spot_lights: true,
            spot_shadows: true,
            spot_cookies: true,
            point_lights: true,
            point_shadows: true,
            point_cookies: true,
            occlusion_culling: true,
            temporal_reprojection: true,
        }
    }
}

/// Availability reported by one light category manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryState {
    /// At least one member is visible
    pub has_visible: bool,
    /// At least one visible member casts shadows
    pub has_shadow_casters: bool,
    /// At least one visible member casts a cookie
    pub has_cookie_casters: bool,
}

/// Availability reported by the volume manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VolumeState {
    /// At least one volume is visible
    pub has_visible: bool,
    /// The composed mask atlas holds at least one mask
    pub has_texture_mask: bool,
    /// At least one visible volume uses a noise mask
    pub has_noise_mask: bool,
}

/// Everything queried at runtime to resolve a frame's flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeState {
    /// Volume availability
    pub volumes: VolumeState,
    /// Directional light availability
    pub directional: CategoryState,
    /// Spot light availability
    pub spot: CategoryState,
    /// Point light availability
    pub point: CategoryState,
    /// Active cascade configuration
    pub cascades: ShadowCascades,
    /// The camera provides a depth texture
    pub has_depth_texture: bool,
    /// The read side of the lighting history holds a previous frame
    pub has_history: bool,
}

struct LightFlags {
    lights: FeatureFlags,
    shadows: FeatureFlags,
    cookies: FeatureFlags,
}

const DIRECTIONAL_FLAGS: LightFlags = LightFlags {
    lights: FeatureFlags::DIRECTIONAL_LIGHTS,
    shadows: FeatureFlags::DIRECTIONAL_SHADOWS,
    cookies: FeatureFlags::DIRECTIONAL_COOKIES,
};

const SPOT_FLAGS: LightFlags =
    LightFlags { lights: FeatureFlags::SPOT_LIGHTS, shadows: FeatureFlags::SPOT_SHADOWS, cookies: FeatureFlags::SPOT_COOKIES };

const POINT_FLAGS: LightFlags = LightFlags {
    lights: FeatureFlags::POINT_LIGHTS,
    shadows: FeatureFlags::POINT_SHADOWS,
    cookies: FeatureFlags::POINT_COOKIES,
};

fn resolve_lights(
    flags: &mut FeatureFlags,
    bits: &LightFlags,
    enabled: bool,
    shadows: bool,
    cookies: bool,
    state: &CategoryState,
) {
    flags.set(bits.lights, enabled && state.has_visible);
    let parent = flags.contains(bits.lights);
    flags.set(bits.shadows, parent && shadows && state.has_shadow_casters);
    flags.set(bits.cookies, parent && cookies && state.has_cookie_casters);
}

/// Resolve the flags of one frame
pub fn resolve(toggles: &FeatureToggles, state: &RuntimeState) -> FeatureFlags {
    let mut flags = FeatureFlags::empty();

    flags.set(FeatureFlags::VOLUMES, toggles.volumes && state.volumes.has_visible);
    let volumes = flags.contains(FeatureFlags::VOLUMES);
    flags.set(
        FeatureFlags::VOLUMES_TEXTURE_MASK,
        volumes && toggles.volume_texture_masks && state.volumes.has_texture_mask,
    );
    flags.set(FeatureFlags::VOLUMES_NOISE_MASK, volumes && toggles.volume_noise_masks && state.volumes.has_noise_mask);

    resolve_lights(
        &mut flags,
        &DIRECTIONAL_FLAGS,
        toggles.directional_lights,
        toggles.directional_shadows,
        toggles.directional_cookies,
        &state.directional,
    );
    if flags.contains(FeatureFlags::DIRECTIONAL_SHADOWS) {
        flags.insert(state.cascades.flag());
    }
    resolve_lights(&mut flags, &SPOT_FLAGS, toggles.spot_lights, toggles.spot_shadows, toggles.spot_cookies, &state.spot);
    resolve_lights(
        &mut flags,
        &POINT_FLAGS,
        toggles.point_lights,
        toggles.point_shadows,
        toggles.point_cookies,
        &state.point,
    );

    flags.set(FeatureFlags::OCCLUSION, toggles.occlusion_culling && state.has_depth_texture);
    flags.set(FeatureFlags::REPROJECTION, toggles.temporal_reprojection && state.has_history);
    flags
}

/// Stateful wrapper around [`resolve`] that logs variant changes
#[derive(Debug, Default)]
pub struct FeatureFlagResolver {
    toggles: FeatureToggles,
    last: Option<FeatureFlags>,
}

impl FeatureFlagResolver {
    /// Create a resolver for a set of user toggles
    pub const fn new(toggles: FeatureToggles) -> Self {
        Self { toggles, last: None }
    }

    /// Current user toggles
    pub const fn toggles(&self) -> &FeatureToggles {
        &self.toggles
    }

    /// Replace the user toggles; takes effect on the next resolve
    pub fn set_toggles(&mut self, toggles: FeatureToggles) {
        self.toggles = toggles;
    }

    /// Flags of the previous resolve
    pub const fn last(&self) -> Option<FeatureFlags> {
        self.last
    }

    /// Resolve a frame's flags against the current toggles
    pub fn resolve(&mut self, state: &RuntimeState) -> FeatureFlags {
        let flags = resolve(&self.toggles, state);
        if self.last != Some(flags) {
            log::debug!("FeatureFlagResolver: kernel variant {:#x} ({:?})", flags.bits(), flags);
            self.last = Some(flags);
        }
        flags
    }
}
