//! Density volumes
//!
//! The 3D mask atlas is keyed by mask presence, not by visibility: every
//! registered volume with a mask owns a slab whether it is visible or not.
//! Any membership or mask change, including a volume dropped without
//! unregistering, resets the whole candidate list and
//! re-adds every registered volume's mask in registry order, since slab
//! indices are not stable across insertion and removal.

use super::error::CategoryError;
use super::records::{VolumeParameters, NO_INDEX};
use crate::compose::{ComposedArray, ParameterBuffer, SourceTexture};
use crate::culling::{Cullable, CullingView, Shared, VisibilityCuller};
use crate::error::FogResult;
use crate::features::{FeatureFlags, VolumeState};
use crate::gpu::{names, Bindings, GpuBackend, TextureFormat};

/// Format of volume mask textures
pub const VOLUME_MASK_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// A density volume
pub trait VolumetricVolume: Cullable {
    /// 3D mask texture
    fn texture_mask(&self) -> Option<SourceTexture>;

    /// Whether the volume evaluates a noise mask
    fn uses_noise_mask(&self) -> bool;

    /// Receive the current mask slab, `-1` when absent
    fn set_texture_mask_index(&mut self, index: i32);

    /// Packed record for this frame
    fn parameters(&self) -> VolumeParameters;
}

/// Shared handle to a volume
pub type VolumeRef = Shared<dyn VolumetricVolume>;

/// Culling, mask composition and parameter packing for volumes
pub struct VolumeManager {
    culler: VisibilityCuller<dyn VolumetricVolume>,
    masks: ComposedArray,
    parameters: ParameterBuffer,
    masks_dirty: bool,
    mask_revision: u64,
    visible_noise_masks: usize,
}

impl VolumeManager {
    /// Create a manager for cubic masks of `mask_size`
    pub fn new(mask_size: u32) -> Self {
        Self {
            culler: VisibilityCuller::new("Volumes"),
            masks: ComposedArray::stacked_3d("VolumeMasks", mask_size, VOLUME_MASK_FORMAT),
            parameters: ParameterBuffer::for_record::<VolumeParameters>("VolumesDataBuffer"),
            masks_dirty: false,
            mask_revision: 0,
            visible_noise_masks: 0,
        }
    }

    /// Add a volume
    pub fn register(&mut self, volume: &VolumeRef) -> Result<(), CategoryError> {
        if !self.culler.register(volume) {
            return Err(CategoryError::AlreadyRegistered("Volumes"));
        }
        self.masks_dirty = true;
        log::debug!("Volumes: registered volume, {} total", self.culler.registered_count());
        Ok(())
    }

    /// Remove a volume; `false` if it was not a member
    pub fn unregister(&mut self, volume: &VolumeRef) -> bool {
        if !self.culler.unregister(volume) {
            return false;
        }
        volume.borrow_mut().set_texture_mask_index(NO_INDEX);
        self.masks_dirty = true;
        true
    }

    /// Whether a volume is a member
    pub fn contains(&self, volume: &VolumeRef) -> bool {
        self.culler.contains(volume)
    }

    /// Signal that a member's mask was enabled, disabled or replaced
    pub fn notify_mask_changed(&mut self) {
        self.masks_dirty = true;
    }

    fn rebuild_candidates(&mut self) {
        self.masks.clear();
        for volume in self.culler.registered_objects() {
            let Some(mask) = volume.borrow().texture_mask() else {
                continue;
            };
            if let Err(error) = self.masks.add_texture(mask) {
                log::warn!("{}, mask skipped", error);
            }
        }
        self.masks_dirty = false;
        log::debug!("Volumes: mask candidates reset, {} mask(s)", self.masks.candidate_count());
    }

    fn mask_index(&self, volume: &dyn VolumetricVolume) -> i32 {
        volume.texture_mask().map_or(NO_INDEX, |mask| self.masks.texture_index(mask.handle))
    }

    /// Cull, compose and pack this frame's records
    pub fn update(&mut self, backend: &mut dyn GpuBackend, view: &CullingView) -> FogResult<()> {
        if !self.culler.update(view).is_empty() {
            self.masks_dirty = true;
        }
        if self.masks_dirty {
            self.rebuild_candidates();
        }

        self.masks.generate(backend)?;
        if self.masks.revision() != self.mask_revision {
            self.mask_revision = self.masks.revision();
            for volume in self.culler.registered_objects() {
                let index = self.mask_index(&*volume.borrow());
                volume.borrow_mut().set_texture_mask_index(index);
            }
        }

        self.parameters.prepare(backend, self.culler.visible_objects_count())?;
        self.visible_noise_masks = 0;
        for volume in self.culler.visible_objects() {
            let volume = volume.borrow();
            let mut record = volume.parameters();
            record.texture_mask.index = self.mask_index(&*volume);
            if volume.uses_noise_mask() {
                self.visible_noise_masks += 1;
            }
            self.parameters.push(&record)?;
        }
        self.parameters.upload(backend)?;

        log::trace!(
            "Volumes: {} of {} visible, {} mask(s)",
            self.culler.visible_objects_count(),
            self.culler.registered_count(),
            self.masks.layer_count()
        );
        Ok(())
    }

    /// Whether any volume was visible in the last update
    pub fn has_visible_volumes(&self) -> bool {
        self.culler.has_visible_objects()
    }

    /// Whether the mask atlas holds at least one mask
    pub fn has_texture_masks(&self) -> bool {
        self.masks.array().is_some()
    }

    /// Whether a visible volume uses a noise mask
    pub const fn has_visible_noise_masks(&self) -> bool {
        self.visible_noise_masks > 0
    }

    /// Visible volume count of the last update
    pub fn visible_count(&self) -> usize {
        self.culler.visible_objects_count()
    }

    /// Registered volume count
    pub fn registered_count(&self) -> usize {
        self.culler.registered_count()
    }

    /// Availability for feature resolution
    pub fn volume_state(&self) -> VolumeState {
        VolumeState {
            has_visible: self.has_visible_volumes(),
            has_texture_mask: self.has_texture_masks(),
            has_noise_mask: self.has_visible_noise_masks(),
        }
    }

    /// Mask atlas
    pub const fn masks(&self) -> &ComposedArray {
        &self.masks
    }

    /// Parameter buffer of the last update
    pub const fn parameters(&self) -> &ParameterBuffer {
        &self.parameters
    }

    /// Bind the resources of every enabled volume feature
    pub fn bind(&self, flags: FeatureFlags, bindings: &mut Bindings) {
        if !flags.contains(FeatureFlags::VOLUMES) {
            return;
        }
        if let Some(buffer) = self.parameters.buffer() {
            bindings.buffer(names::VOLUMES_BUFFER, buffer);
        }
        bindings.int(names::VOLUMES_COUNT, i32::try_from(self.parameters.count()).unwrap_or(i32::MAX));
        if flags.contains(FeatureFlags::VOLUMES_TEXTURE_MASK) {
            if let Some(masks) = self.masks.array() {
                bindings.texture(names::VOLUME_MASKS, masks);
            }
        }
    }

    /// Release GPU resources and forget every member
    pub fn release(&mut self, backend: &mut dyn GpuBackend) {
        self.masks.release(backend);
        self.parameters.release(backend);
        self.culler.dispose();
        self.masks_dirty = false;
    }
}
