//! Lights and volumes for tests

use std::cell::RefCell;
use std::rc::Rc;

use super::light::{LightKind, LightParameters, ShadowLayoutChanged, VolumetricLight, CASCADE_DATA_EXTENT, CASCADE_DATA_FORMAT};
use super::records::{
    DirectionalLightParameters, PointLightParameters, SpotLightParameters, VolumeParameters, VolumeShape, NO_INDEX,
};
use super::volume::VolumetricVolume;
use crate::compose::SourceTexture;
use crate::culling::{BoundingSphere, Cullable};
use crate::foundation::math::{vec3_to_array, Vec3};
use crate::gpu::{GpuBackend, GpuResult, TextureDescriptor, TextureFormat};

pub fn shared<T>(value: T) -> Rc<RefCell<T>> {
    Rc::new(RefCell::new(value))
}

pub fn source(backend: &mut dyn GpuBackend, descriptor: TextureDescriptor, label: &str) -> SourceTexture {
    let handle = backend.create_texture(&descriptor, label).unwrap();
    SourceTexture::new(handle, descriptor)
}

pub struct TestLight {
    pub kind: LightKind,
    pub record_kind: LightKind,
    pub sphere: BoundingSphere,
    pub color: [f32; 3],
    pub shadow: Option<SourceTexture>,
    pub shadow_data: Option<SourceTexture>,
    pub cookie: Option<SourceTexture>,
    pub shadow_index: i32,
    pub cookie_index: i32,
    pub layout_changes: u32,
}

impl TestLight {
    pub fn new(kind: LightKind, position: Vec3, radius: f32) -> Self {
        Self {
            kind,
            record_kind: kind,
            sphere: BoundingSphere::new(position, radius),
            color: [1.0; 3],
            shadow: None,
            shadow_data: None,
            cookie: None,
            shadow_index: NO_INDEX,
            cookie_index: NO_INDEX,
            layout_changes: 0,
        }
    }

    pub fn directional() -> Self {
        Self { sphere: BoundingSphere::infinite(), ..Self::new(LightKind::Directional, Vec3::zeros(), 0.0) }
    }

    pub fn with_shadow(mut self, backend: &mut dyn GpuBackend, width: u32, height: u32) -> Self {
        let descriptor = TextureDescriptor::d2(width, height, TextureFormat::R32Float);
        self.shadow = Some(source(backend, descriptor, "TestShadowMap"));
        self
    }

    pub fn with_shadow_data(mut self, backend: &mut dyn GpuBackend) -> Self {
        let (width, height) = CASCADE_DATA_EXTENT;
        let descriptor = TextureDescriptor::d2(width, height, CASCADE_DATA_FORMAT);
        self.shadow_data = Some(source(backend, descriptor, "TestShadowData"));
        self
    }

    pub fn with_cookie(mut self, backend: &mut dyn GpuBackend, size: u32) -> Self {
        let descriptor = TextureDescriptor::d2(size, size, TextureFormat::Rgba8Unorm);
        self.cookie = Some(source(backend, descriptor, "TestCookie"));
        self
    }

    pub const fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }

    pub const fn with_record_kind(mut self, kind: LightKind) -> Self {
        self.record_kind = kind;
        self
    }
}

impl Cullable for TestLight {
    fn bounding_sphere(&self) -> BoundingSphere {
        self.sphere
    }
}

impl VolumetricLight for TestLight {
    fn kind(&self) -> LightKind {
        self.kind
    }

    fn casts_shadows(&self) -> bool {
        self.shadow.is_some()
    }

    fn casts_cookie(&self) -> bool {
        self.cookie.is_some()
    }

    fn shadow_texture(&self) -> Option<SourceTexture> {
        self.shadow
    }

    fn shadow_data_texture(&self) -> Option<SourceTexture> {
        self.shadow_data
    }

    fn cookie_texture(&self) -> Option<SourceTexture> {
        self.cookie
    }

    fn set_shadow_map_index(&mut self, index: i32) {
        self.shadow_index = index;
    }

    fn set_cookie_map_index(&mut self, index: i32) {
        self.cookie_index = index;
    }

    fn parameters(&self) -> LightParameters {
        let position = vec3_to_array(&self.sphere.position);
        match self.record_kind {
            LightKind::Directional => LightParameters::Directional(DirectionalLightParameters {
                color: self.color,
                shadow_index: self.shadow_index,
                cookie_index: self.cookie_index,
                ..DirectionalLightParameters::default()
            }),
            LightKind::Spot => LightParameters::Spot(SpotLightParameters {
                color: self.color,
                position,
                range: self.sphere.radius,
                shadow_index: self.shadow_index,
                cookie_index: self.cookie_index,
                ..SpotLightParameters::default()
            }),
            LightKind::Point => LightParameters::Point(PointLightParameters {
                color: self.color,
                position,
                range: self.sphere.radius,
                shadow_index: self.shadow_index,
                cookie_index: self.cookie_index,
                ..PointLightParameters::default()
            }),
        }
    }

    fn on_shadow_layout_changed(&mut self, backend: &mut dyn GpuBackend, event: &ShadowLayoutChanged) -> GpuResult<()> {
        self.layout_changes += 1;
        if let Some(old) = self.shadow.take() {
            backend.release_texture(old.handle)?;
            let descriptor = TextureDescriptor::d2(event.shadow_map_width, event.shadow_map_height, TextureFormat::R32Float);
            let handle = backend.create_texture(&descriptor, "TestShadowMap")?;
            self.shadow = Some(SourceTexture::new(handle, descriptor));
        }
        Ok(())
    }
}

pub struct TestVolume {
    pub sphere: BoundingSphere,
    pub shape: VolumeShape,
    pub mask: Option<SourceTexture>,
    pub noise: bool,
    pub density: f32,
    pub mask_index: i32,
}

impl TestVolume {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self {
            sphere: BoundingSphere::new(position, radius),
            shape: VolumeShape::Box,
            mask: None,
            noise: false,
            density: 1.0,
            mask_index: NO_INDEX,
        }
    }

    pub fn global() -> Self {
        Self { sphere: BoundingSphere::infinite(), shape: VolumeShape::Global, ..Self::new(Vec3::zeros(), 0.0) }
    }

    pub fn with_mask(mut self, backend: &mut dyn GpuBackend, size: u32) -> Self {
        let descriptor = TextureDescriptor::d3(size, size, size, TextureFormat::Rgba8Unorm);
        self.mask = Some(source(backend, descriptor, "TestVolumeMask"));
        self
    }

    pub const fn with_noise(mut self) -> Self {
        self.noise = true;
        self
    }
}

impl Cullable for TestVolume {
    fn bounding_sphere(&self) -> BoundingSphere {
        self.sphere
    }
}

impl VolumetricVolume for TestVolume {
    fn texture_mask(&self) -> Option<SourceTexture> {
        self.mask
    }

    fn uses_noise_mask(&self) -> bool {
        self.noise
    }

    fn set_texture_mask_index(&mut self, index: i32) {
        self.mask_index = index;
    }

    fn parameters(&self) -> VolumeParameters {
        let mut record = VolumeParameters::with_shape(self.shape);
        record.noise_mask.enabled = i32::from(self.noise);
        record.density.enabled = 1;
        record.density.value = self.density;
        record
    }
}
