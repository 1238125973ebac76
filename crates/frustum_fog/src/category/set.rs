//! The four category managers, updated in a fixed phase order

use super::error::CategoryError;
use super::light::{LightKind, LightManager, LightRef, ShadowLayoutChanged};
use super::volume::{VolumeManager, VolumeRef};
use crate::config::FogSettings;
use crate::culling::CullingView;
use crate::error::FogResult;
use crate::features::{FeatureFlags, RuntimeState, ShadowCascades};
use crate::gpu::{Bindings, GpuBackend, GpuResult};

/// Visible member counts of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleCounts {
    /// Directional lights
    pub directional: usize,
    /// Spot lights
    pub spot: usize,
    /// Point lights
    pub point: usize,
    /// Volumes
    pub volumes: usize,
}

/// Every category taking part in the fog
pub struct CategorySet {
    directional: LightManager,
    spot: LightManager,
    point: LightManager,
    volumes: VolumeManager,
}

impl CategorySet {
    /// Create empty managers sized from the settings
    pub fn new(settings: &FogSettings) -> Self {
        let shadows = &settings.shadows;
        let cookies = &settings.cookies;
        Self {
            directional: LightManager::directional(
                shadows.directional_resolution,
                cookies.directional_resolution,
                shadows.cascades,
            ),
            spot: LightManager::new(LightKind::Spot, shadows.spot_resolution, cookies.spot_resolution),
            point: LightManager::new(LightKind::Point, shadows.point_resolution, cookies.point_resolution),
            volumes: VolumeManager::new(settings.volume_mask_size),
        }
    }

    /// Manager for one light kind
    pub const fn lights(&self, kind: LightKind) -> &LightManager {
        match kind {
            LightKind::Directional => &self.directional,
            LightKind::Spot => &self.spot,
            LightKind::Point => &self.point,
        }
    }

    /// Mutable manager for one light kind
    pub fn lights_mut(&mut self, kind: LightKind) -> &mut LightManager {
        match kind {
            LightKind::Directional => &mut self.directional,
            LightKind::Spot => &mut self.spot,
            LightKind::Point => &mut self.point,
        }
    }

    /// Volume manager
    pub const fn volumes(&self) -> &VolumeManager {
        &self.volumes
    }

    /// Mutable volume manager
    pub fn volumes_mut(&mut self) -> &mut VolumeManager {
        &mut self.volumes
    }

    /// Register a light with the manager of its declared kind
    pub fn register_light(&mut self, light: &LightRef) -> Result<(), CategoryError> {
        let kind = light.borrow().kind();
        self.lights_mut(kind).register(light)
    }

    /// Unregister a light from whichever manager holds it
    pub fn unregister_light(&mut self, light: &LightRef) -> bool {
        LightKind::ALL.into_iter().any(|kind| self.lights_mut(kind).unregister(light))
    }

    /// Register a volume
    pub fn register_volume(&mut self, volume: &VolumeRef) -> Result<(), CategoryError> {
        self.volumes.register(volume)
    }

    /// Unregister a volume
    pub fn unregister_volume(&mut self, volume: &VolumeRef) -> bool {
        self.volumes.unregister(volume)
    }

    /// Apply the directional cascade configuration
    pub fn apply_cascades(
        &mut self,
        backend: &mut dyn GpuBackend,
        cascades: ShadowCascades,
    ) -> GpuResult<Option<ShadowLayoutChanged>> {
        self.directional.apply_cascades(backend, cascades)
    }

    /// Run every manager's update: directional, spot, point, then volumes
    pub fn update(&mut self, backend: &mut dyn GpuBackend, view: &CullingView) -> FogResult<()> {
        self.directional.update(backend, view)?;
        self.spot.update(backend, view)?;
        self.point.update(backend, view)?;
        self.volumes.update(backend, view)
    }

    /// Category availability; camera and history fields are left at their defaults
    pub fn runtime_state(&self) -> RuntimeState {
        RuntimeState {
            volumes: self.volumes.volume_state(),
            directional: self.directional.category_state(),
            spot: self.spot.category_state(),
            point: self.point.category_state(),
            cascades: self.directional.cascades(),
            ..RuntimeState::default()
        }
    }

    /// Visible member counts of the last update
    pub fn visible_counts(&self) -> VisibleCounts {
        VisibleCounts {
            directional: self.directional.visible_count(),
            spot: self.spot.visible_count(),
            point: self.point.visible_count(),
            volumes: self.volumes.visible_count(),
        }
    }

    /// Bind every enabled category
    pub fn bind(&self, flags: FeatureFlags, bindings: &mut Bindings) {
        for kind in LightKind::ALL {
            self.lights(kind).bind(flags, bindings);
        }
        self.volumes.bind(flags, bindings);
    }

    /// Release every manager
    pub fn release(&mut self, backend: &mut dyn GpuBackend) {
        for kind in LightKind::ALL {
            self.lights_mut(kind).release(backend);
        }
        self.volumes.release(backend);
        log::debug!("CategorySet: released");
    }
}
