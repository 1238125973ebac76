//! Headless fog demo
//!
//! Scatters lights and fog volumes around an orbiting camera and runs the
//! volumetric pipeline against the recording backend. Pass a `.toml` or
//! `.ron` settings file as the first argument to override the defaults.

use std::cell::RefCell;
use std::rc::Rc;

use frustum_fog::category::records::{
    DirectionalLightParameters, PointLightParameters, SpotLightParameters, VolumeParameters, VolumeShape, NO_INDEX,
};
use frustum_fog::category::{CASCADE_DATA_EXTENT, CASCADE_DATA_FORMAT, VOLUME_MASK_FORMAT};
use frustum_fog::foundation::logging;
use frustum_fog::foundation::math::{vec3_to_array, Vec3};
use frustum_fog::gpu::{release_texture_quietly, GpuResult, TextureDescriptor, TextureFormat};
use frustum_fog::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FRAMES: u64 = 300;
const FRAME_STEP: f32 = 1.0 / 60.0;

fn create_source(backend: &mut dyn GpuBackend, descriptor: TextureDescriptor, label: &str) -> GpuResult<SourceTexture> {
    let handle = backend.create_texture(&descriptor, label)?;
    Ok(SourceTexture::new(handle, descriptor))
}

/// A light of the demo scene
struct DemoLight {
    kind: LightKind,
    position: Vec3,
    direction: Vec3,
    range: f32,
    color: [f32; 3],
    shadow: Option<SourceTexture>,
    shadow_data: Option<SourceTexture>,
    cookie: Option<SourceTexture>,
    shadow_index: i32,
    cookie_index: i32,
}

impl DemoLight {
    fn new(kind: LightKind, position: Vec3, range: f32, color: [f32; 3]) -> Self {
        Self {
            kind,
            position,
            direction: Vec3::new(0.0, -1.0, 0.0),
            range,
            color,
            shadow: None,
            shadow_data: None,
            cookie: None,
            shadow_index: NO_INDEX,
            cookie_index: NO_INDEX,
        }
    }

    fn sun(backend: &mut dyn GpuBackend, settings: &FogSettings) -> GpuResult<Self> {
        let mut sun = Self::new(LightKind::Directional, Vec3::new(0.0, 50.0, 0.0), 0.0, [1.0, 0.95, 0.85]);
        sun.direction = Vec3::new(0.3, -1.0, 0.2).normalize();
        let (width, height) = settings.shadows.cascades.shadow_map_extent(settings.shadows.directional_resolution);
        sun.shadow = Some(create_source(backend, TextureDescriptor::d2(width, height, TextureFormat::R32Float), "SunShadow")?);
        let (data_width, data_height) = CASCADE_DATA_EXTENT;
        sun.shadow_data = Some(create_source(
            backend,
            TextureDescriptor::d2(data_width, data_height, CASCADE_DATA_FORMAT),
            "SunShadowData",
        )?);
        Ok(sun)
    }

    fn with_shadow(mut self, backend: &mut dyn GpuBackend, resolution: u32) -> GpuResult<Self> {
        let descriptor = TextureDescriptor::d2(resolution, resolution, TextureFormat::R32Float);
        self.shadow = Some(create_source(backend, descriptor, "DemoShadow")?);
        Ok(self)
    }

    fn with_cookie(mut self, cookie: SourceTexture) -> Self {
        self.cookie = Some(cookie);
        self
    }
}

impl Cullable for DemoLight {
    fn bounding_sphere(&self) -> BoundingSphere {
        match self.kind {
            LightKind::Directional => BoundingSphere::infinite(),
            LightKind::Spot | LightKind::Point => BoundingSphere::new(self.position, self.range),
        }
    }
}

impl VolumetricLight for DemoLight {
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
        let position = vec3_to_array(&self.position);
        let direction = vec3_to_array(&self.direction);
        match self.kind {
            LightKind::Directional => LightParameters::Directional(DirectionalLightParameters {
                color: self.color,
                position,
                direction,
                shadow_index: self.shadow_index,
                cookie_index: self.cookie_index,
                ..DirectionalLightParameters::default()
            }),
            LightKind::Spot => LightParameters::Spot(SpotLightParameters {
                color: self.color,
                position,
                direction,
                range: self.range,
                shadow_index: self.shadow_index,
                cookie_index: self.cookie_index,
                ..SpotLightParameters::default()
            }),
            LightKind::Point => LightParameters::Point(PointLightParameters {
                color: self.color,
                position,
                range: self.range,
                shadow_index: self.shadow_index,
                cookie_index: self.cookie_index,
                ..PointLightParameters::default()
            }),
        }
    }

    fn on_shadow_layout_changed(&mut self, backend: &mut dyn GpuBackend, event: &ShadowLayoutChanged) -> GpuResult<()> {
        if let Some(old) = self.shadow.take() {
            backend.release_texture(old.handle)?;
            let descriptor =
                TextureDescriptor::d2(event.shadow_map_width, event.shadow_map_height, TextureFormat::R32Float);
            self.shadow = Some(create_source(backend, descriptor, "SunShadow")?);
        }
        Ok(())
    }
}

/// A fog volume of the demo scene
struct DemoVolume {
    shape: VolumeShape,
    position: Vec3,
    radius: f32,
    density: f32,
    mask: Option<SourceTexture>,
    noise: bool,
    mask_index: i32,
}

impl Cullable for DemoVolume {
    fn bounding_sphere(&self) -> BoundingSphere {
        if self.shape == VolumeShape::Global {
            BoundingSphere::infinite()
        } else {
            BoundingSphere::new(self.position, self.radius)
        }
    }
}

impl VolumetricVolume for DemoVolume {
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
        record.transform[3] = [self.position.x, self.position.y, self.position.z, 1.0];
        record.texture_mask.index = self.mask_index;
        record.noise_mask.enabled = i32::from(self.noise);
        record.noise_mask.speed = 0.25;
        record.density.enabled = 1;
        record.density.value = self.density;
        record
    }
}

fn shared<T>(value: T) -> Rc<RefCell<T>> {
    Rc::new(RefCell::new(value))
}

/// Everything the demo owns besides the pipeline
struct DemoScene {
    lights: Vec<LightRef>,
    volumes: Vec<VolumeRef>,
    orbiting: Rc<RefCell<DemoLight>>,
    textures: Vec<TextureHandle>,
}

impl DemoScene {
    fn build(
        backend: &mut dyn GpuBackend,
        categories: &mut CategorySet,
        settings: &FogSettings,
        rng: &mut StdRng,
    ) -> Result<Self, FogError> {
        let mut lights: Vec<LightRef> = Vec::new();
        let mut volumes: Vec<VolumeRef> = Vec::new();

        let sun = shared(DemoLight::sun(backend, settings)?);
        lights.push(sun);

        // One cookie shared by every spot light
        let cookie_size = settings.cookies.spot_resolution;
        let cookie = create_source(
            backend,
            TextureDescriptor::d2(cookie_size, cookie_size, TextureFormat::Rgba8Unorm),
            "SpotCookie",
        )?;

        for i in 0..12 {
            let position = Vec3::new(rng.gen_range(-40.0..40.0), rng.gen_range(1.0..8.0), rng.gen_range(-40.0..40.0));
            let color = [rng.gen_range(0.2..1.0), rng.gen_range(0.2..1.0), rng.gen_range(0.2..1.0)];
            let mut spot = DemoLight::new(LightKind::Spot, position, rng.gen_range(4.0..12.0), color);
            if i % 3 == 0 {
                spot = spot.with_shadow(backend, settings.shadows.spot_resolution)?;
            }
            if i % 2 == 0 {
                spot = spot.with_cookie(cookie);
            }
            lights.push(shared(spot));
        }

        for _ in 0..24 {
            let position = Vec3::new(rng.gen_range(-60.0..60.0), rng.gen_range(0.5..5.0), rng.gen_range(-60.0..60.0));
            let color = [rng.gen_range(0.5..1.0), rng.gen_range(0.3..0.8), rng.gen_range(0.1..0.5)];
            lights.push(shared(DemoLight::new(LightKind::Point, position, rng.gen_range(1.0..6.0), color)));
        }

        let orbiting = shared(
            DemoLight::new(LightKind::Point, Vec3::new(5.0, 2.0, 0.0), 6.0, [0.3, 0.6, 1.0])
                .with_shadow(backend, settings.shadows.point_resolution)?,
        );
        lights.push(orbiting.clone());

        volumes.push(shared(DemoVolume {
            shape: VolumeShape::Global,
            position: Vec3::zeros(),
            radius: 0.0,
            density: 0.02,
            mask: None,
            noise: false,
            mask_index: NO_INDEX,
        }));

        let mask_size = settings.volume_mask_size;
        let mask = create_source(
            backend,
            TextureDescriptor::d3(mask_size, mask_size, mask_size, VOLUME_MASK_FORMAT),
            "GroundMistMask",
        )?;
        let shapes = [VolumeShape::Box, VolumeShape::Sphere, VolumeShape::Cylinder, VolumeShape::Cone];
        for (i, shape) in shapes.into_iter().cycle().take(8).enumerate() {
            let position = Vec3::new(rng.gen_range(-30.0..30.0), 0.0, rng.gen_range(-30.0..30.0));
            volumes.push(shared(DemoVolume {
                shape,
                position,
                radius: rng.gen_range(3.0..10.0),
                density: rng.gen_range(0.1..0.8),
                mask: (i % 2 == 0).then_some(mask),
                noise: i % 3 == 0,
                mask_index: NO_INDEX,
            }));
        }

        for light in &lights {
            categories.register_light(light)?;
        }
        for volume in &volumes {
            categories.register_volume(volume)?;
        }
        log::info!("Demo scene: {} lights, {} volumes", lights.len(), volumes.len());

        Ok(Self { lights, volumes, orbiting, textures: vec![cookie.handle, mask.handle] })
    }

    fn animate(&self, time: f32) {
        self.orbiting.borrow_mut().position = Vec3::new(5.0 * time.cos(), 2.0, 5.0 * time.sin());
    }

    fn release(self, backend: &mut dyn GpuBackend, categories: &mut CategorySet) {
        for light in &self.lights {
            categories.unregister_light(light);
            // Shadows may have been recreated since build, release the current ones
            let light = light.borrow();
            for texture in [light.shadow_texture(), light.shadow_data_texture()].into_iter().flatten() {
                release_texture_quietly(backend, texture.handle);
            }
        }
        for volume in &self.volumes {
            categories.unregister_volume(volume);
        }
        for handle in self.textures {
            release_texture_quietly(backend, handle);
        }
    }
}

fn load_settings() -> Result<FogSettings, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(FogSettings::load_from_file(path)?),
        None => Ok(FogSettings::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    log::info!("Starting fog demo...");

    let settings = load_settings()?;
    let mut backend = HeadlessBackend::new();
    let mut categories = CategorySet::new(&settings);
    let mut rng = StdRng::seed_from_u64(7);
    let scene = DemoScene::build(&mut backend, &mut categories, &settings, &mut rng)?;
    let mut frustum = Frustum::new(settings)?;

    let mut timer = Timer::new();
    while timer.frame_count() < FRAMES {
        timer.advance(FRAME_STEP);
        let time = timer.animation_time();
        scene.animate(time);

        match timer.frame_count() {
            120 => frustum.set_cascades(ShadowCascades::Two),
            200 => frustum.set_resolution([96, 54, 64]),
            _ => {}
        }

        let eye = Vec3::new(30.0 * (time * 0.2).cos(), 6.0, 30.0 * (time * 0.2).sin());
        let camera = CameraView::perspective(eye, Vec3::zeros(), Vec3::y(), 1.0, 16.0 / 9.0, 0.1, 200.0);
        let report = frustum.render_frame(&mut backend, &mut categories, &FrameInput::new(camera, time))?;

        if report.reallocated || report.layout_changed.is_some() || report.frame % 60 == 0 {
            log::info!(
                "Frame {}: grid {}x{}x{}, {} dispatches, visible {:?}, flags {:?}",
                report.frame,
                report.resolution.x,
                report.resolution.y,
                report.resolution.z,
                report.dispatches,
                report.visible,
                report.flags
            );
        }
    }

    frustum.release(&mut backend);
    scene.release(&mut backend, &mut categories);
    categories.release(&mut backend);

    let stats = backend.stats();
    log::info!(
        "Fog demo finished: {} dispatches, {} textures created, {} released, {} live",
        stats.dispatches,
        stats.textures_created,
        stats.textures_released,
        backend.live_textures()
    );
    Ok(())
}
