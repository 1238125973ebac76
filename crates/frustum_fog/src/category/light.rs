//! Light categories
//!
//! Directional, spot and point lights share one manager type. What differs
//! between them (labels, record stride, formats, binding names, flags) is
//! looked up in [`CategoryLayout`] through [`LightKind::layout`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::error::CategoryError;
use super::records::{DirectionalLightParameters, PointLightParameters, SpotLightParameters, NO_INDEX};
use crate::compose::{ComposedArray, ParameterBuffer, SourceTexture};
use crate::culling::{Cullable, CullingView, Shared, VisibilityCuller};
use crate::error::FogResult;
use crate::features::{CategoryState, FeatureFlags, ShadowCascades};
use crate::gpu::{names, Bindings, GpuBackend, GpuResult, TextureFormat, TextureHandle};

/// Closed set of light categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    /// Infinitely distant light, never culled
    Directional,
    /// Cone light
    Spot,
    /// Omnidirectional light
    Point,
}

impl LightKind {
    /// Every kind, in update order
    pub const ALL: [Self; 3] = [Self::Directional, Self::Spot, Self::Point];

    /// Static description of this category
    pub fn layout(self) -> &'static CategoryLayout {
        &LAYOUTS[self as usize]
    }
}

/// Per-kind constants used by [`LightManager`]
#[derive(Debug)]
pub struct CategoryLayout {
    /// Manager label
    pub label: &'static str,
    /// Parameter buffer label
    pub parameters_label: &'static str,
    /// Shadow map array label
    pub shadow_maps_label: &'static str,
    /// Cookie map array label
    pub cookie_maps_label: &'static str,
    /// Parameter record size in bytes
    pub record_stride: usize,
    /// Shadow map format
    pub shadow_format: TextureFormat,
    /// Cookie map format
    pub cookie_format: TextureFormat,
    /// Flag enabling the category
    pub lights_flag: FeatureFlags,
    /// Flag enabling shadows
    pub shadows_flag: FeatureFlags,
    /// Flag enabling cookies
    pub cookies_flag: FeatureFlags,
    /// Parameter buffer binding
    pub buffer_binding: &'static str,
    /// Record count binding
    pub count_binding: &'static str,
    /// Shadow map array binding
    pub shadow_maps_binding: &'static str,
    /// Cookie map array binding
    pub cookie_maps_binding: &'static str,
    /// Cascade shadow data binding (directional only)
    pub shadow_data_binding: Option<&'static str>,
}

static LAYOUTS: [CategoryLayout; 3] = [
    CategoryLayout {
        label: "DirectionalLights",
        parameters_label: "DirectionalLightsDataBuffer",
        shadow_maps_label: "DirectionalShadowMaps",
        cookie_maps_label: "DirectionalCookieMaps",
        record_stride: std::mem::size_of::<DirectionalLightParameters>(),
        shadow_format: TextureFormat::R32Float,
        cookie_format: TextureFormat::Rgba8Unorm,
        lights_flag: FeatureFlags::DIRECTIONAL_LIGHTS,
        shadows_flag: FeatureFlags::DIRECTIONAL_SHADOWS,
        cookies_flag: FeatureFlags::DIRECTIONAL_COOKIES,
        buffer_binding: names::DIRECTIONAL_LIGHTS_BUFFER,
        count_binding: names::DIRECTIONAL_LIGHTS_COUNT,
        shadow_maps_binding: names::DIRECTIONAL_SHADOW_MAPS,
        cookie_maps_binding: names::DIRECTIONAL_COOKIE_MAPS,
        shadow_data_binding: Some(names::DIRECTIONAL_SHADOW_DATA),
    },
    CategoryLayout {
        label: "SpotLights",
        parameters_label: "SpotLightsDataBuffer",
        shadow_maps_label: "SpotShadowMaps",
        cookie_maps_label: "SpotCookieMaps",
        record_stride: std::mem::size_of::<SpotLightParameters>(),
        shadow_format: TextureFormat::R32Float,
        cookie_format: TextureFormat::Rgba8Unorm,
        lights_flag: FeatureFlags::SPOT_LIGHTS,
        shadows_flag: FeatureFlags::SPOT_SHADOWS,
        cookies_flag: FeatureFlags::SPOT_COOKIES,
        buffer_binding: names::SPOT_LIGHTS_BUFFER,
        count_binding: names::SPOT_LIGHTS_COUNT,
        shadow_maps_binding: names::SPOT_SHADOW_MAPS,
        cookie_maps_binding: names::SPOT_COOKIE_MAPS,
        shadow_data_binding: None,
    },
    CategoryLayout {
        label: "PointLights",
        parameters_label: "PointLightsDataBuffer",
        shadow_maps_label: "PointShadowMaps",
        cookie_maps_label: "PointCookieMaps",
        record_stride: std::mem::size_of::<PointLightParameters>(),
        shadow_format: TextureFormat::R32Float,
        cookie_format: TextureFormat::Rgba8Unorm,
        lights_flag: FeatureFlags::POINT_LIGHTS,
        shadows_flag: FeatureFlags::POINT_SHADOWS,
        cookies_flag: FeatureFlags::POINT_COOKIES,
        buffer_binding: names::POINT_LIGHTS_BUFFER,
        count_binding: names::POINT_LIGHTS_COUNT,
        shadow_maps_binding: names::POINT_SHADOW_MAPS,
        cookie_maps_binding: names::POINT_COOKIE_MAPS,
        shadow_data_binding: None,
    },
];

/// Extent of one directional light's cascade shadow data texture
pub const CASCADE_DATA_EXTENT: (u32, u32) = (32, 1);

/// Format of the cascade shadow data texture
pub const CASCADE_DATA_FORMAT: TextureFormat = TextureFormat::Rgba32Float;

/// Record produced by a light, one payload per kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightParameters {
    /// Directional light record
    Directional(DirectionalLightParameters),
    /// Spot light record
    Spot(SpotLightParameters),
    /// Point light record
    Point(PointLightParameters),
}

impl LightParameters {
    /// Kind the record belongs to
    pub const fn kind(&self) -> LightKind {
        match self {
            Self::Directional(_) => LightKind::Directional,
            Self::Spot(_) => LightKind::Spot,
            Self::Point(_) => LightKind::Point,
        }
    }

    /// Record bytes as uploaded
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Directional(record) => bytemuck::bytes_of(record),
            Self::Spot(record) => bytemuck::bytes_of(record),
            Self::Point(record) => bytemuck::bytes_of(record),
        }
    }

    fn push_to(&self, buffer: &mut ParameterBuffer) -> GpuResult<()> {
        match self {
            Self::Directional(record) => buffer.push(record),
            Self::Spot(record) => buffer.push(record),
            Self::Point(record) => buffer.push(record),
        }
    }
}

/// Raised when the directional cascade configuration changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowLayoutChanged {
    /// Configuration before the change
    pub previous: ShadowCascades,
    /// Configuration after the change
    pub current: ShadowCascades,
    /// New shadow map width
    pub shadow_map_width: u32,
    /// New shadow map height
    pub shadow_map_height: u32,
}

/// A light taking part in volumetric lighting
pub trait VolumetricLight: Cullable {
    /// Declared category
    fn kind(&self) -> LightKind;

    /// Whether the light contributes a shadow map
    fn casts_shadows(&self) -> bool;

    /// Whether the light contributes a cookie map
    fn casts_cookie(&self) -> bool;

    /// Pre-rendered shadow map
    fn shadow_texture(&self) -> Option<SourceTexture>;

    /// Cascade shadow data, directional lights only
    fn shadow_data_texture(&self) -> Option<SourceTexture> {
        None
    }

    /// Cookie map
    fn cookie_texture(&self) -> Option<SourceTexture>;

    /// Receive this frame's shadow map layer, `-1` when absent
    fn set_shadow_map_index(&mut self, index: i32);

    /// Receive this frame's cookie map layer, `-1` when absent
    fn set_cookie_map_index(&mut self, index: i32);

    /// Packed record for this frame
    fn parameters(&self) -> LightParameters;

    /// Re-create shadow resources after a cascade change
    fn on_shadow_layout_changed(&mut self, _backend: &mut dyn GpuBackend, _event: &ShadowLayoutChanged) -> GpuResult<()> {
        Ok(())
    }
}

/// Shared handle to a light
pub type LightRef = Shared<dyn VolumetricLight>;

/// Textures a member offered, including ones another member added first
#[derive(Debug, Clone, Copy, Default)]
struct Contribution {
    shadow: Option<TextureHandle>,
    shadow_data: Option<TextureHandle>,
    cookie: Option<TextureHandle>,
}

impl Contribution {
    fn holds(&self, handle: TextureHandle) -> bool {
        [self.shadow, self.shadow_data, self.cookie].contains(&Some(handle))
    }
}

fn key_of(light: &LightRef) -> usize {
    Rc::as_ptr(light).cast::<()>() as usize
}

fn weak_key_of(light: &Weak<RefCell<dyn VolumetricLight>>) -> usize {
    light.as_ptr().cast::<()>() as usize
}

fn offer(array: &mut ComposedArray, texture: Option<SourceTexture>) -> Option<TextureHandle> {
    let texture = texture?;
    match array.add_texture(texture) {
        Ok(_) => Some(texture.handle),
        Err(error) => {
            log::warn!("{}, texture skipped", error);
            None
        }
    }
}

fn index_in(array: &ComposedArray, texture: Option<SourceTexture>) -> i32 {
    texture.map_or(NO_INDEX, |texture| array.texture_index(texture.handle))
}

/// Culling, texture composition and parameter packing for one light kind
pub struct LightManager {
    kind: LightKind,
    culler: VisibilityCuller<dyn VolumetricLight>,
    shadow_maps: ComposedArray,
    shadow_data: Option<ComposedArray>,
    cookie_maps: ComposedArray,
    parameters: ParameterBuffer,
    contributions: HashMap<usize, Contribution>,
    shadow_resolution: u32,
    cascades: ShadowCascades,
    visible_shadow_casters: usize,
    visible_cookie_casters: usize,
}

impl LightManager {
    /// Create a manager; directional shadow maps start with the default cascades
    pub fn new(kind: LightKind, shadow_resolution: u32, cookie_resolution: u32) -> Self {
        Self::build(kind, shadow_resolution, cookie_resolution, ShadowCascades::default())
    }

    /// Create a directional light manager for a cascade configuration
    pub fn directional(shadow_resolution: u32, cookie_resolution: u32, cascades: ShadowCascades) -> Self {
        Self::build(LightKind::Directional, shadow_resolution, cookie_resolution, cascades)
    }

    fn build(kind: LightKind, shadow_resolution: u32, cookie_resolution: u32, cascades: ShadowCascades) -> Self {
        let layout = kind.layout();
        let (width, height) = shadow_extent(kind, cascades, shadow_resolution);
        let shadow_data = (kind == LightKind::Directional).then(|| {
            let (data_width, data_height) = CASCADE_DATA_EXTENT;
            ComposedArray::layered_2d("DirectionalShadowData", data_width, data_height, CASCADE_DATA_FORMAT)
                .with_always_rebuild(true)
        });
        Self {
            kind,
            culler: VisibilityCuller::new(layout.label),
            shadow_maps: ComposedArray::layered_2d(layout.shadow_maps_label, width, height, layout.shadow_format)
                .with_always_rebuild(true),
            shadow_data,
            cookie_maps: ComposedArray::layered_2d(
                layout.cookie_maps_label,
                cookie_resolution,
                cookie_resolution,
                layout.cookie_format,
            ),
            parameters: ParameterBuffer::new(layout.parameters_label, layout.record_stride),
            contributions: HashMap::new(),
            shadow_resolution,
            cascades,
            visible_shadow_casters: 0,
            visible_cookie_casters: 0,
        }
    }

    /// Managed kind
    pub const fn kind(&self) -> LightKind {
        self.kind
    }

    /// Manager label
    pub fn label(&self) -> &'static str {
        self.kind.layout().label
    }

    /// Active cascade configuration
    pub const fn cascades(&self) -> ShadowCascades {
        self.cascades
    }

    /// Add a light and the textures it casts
    pub fn register(&mut self, light: &LightRef) -> Result<(), CategoryError> {
        let actual = light.borrow().kind();
        if actual != self.kind {
            return Err(CategoryError::KindMismatch { category: self.label(), actual });
        }
        if !self.culler.register(light) {
            return Err(CategoryError::AlreadyRegistered(self.label()));
        }
        let contribution = self.add_textures(&*light.borrow());
        self.contributions.insert(key_of(light), contribution);
        log::debug!("{}: registered light, {} total", self.label(), self.culler.registered_count());
        Ok(())
    }

    /// Remove a light and its textures; `false` if it was not a member
    pub fn unregister(&mut self, light: &LightRef) -> bool {
        if !self.culler.unregister(light) {
            return false;
        }
        if let Some(contribution) = self.contributions.remove(&key_of(light)) {
            self.withdraw(contribution);
        }
        let mut light = light.borrow_mut();
        light.set_shadow_map_index(NO_INDEX);
        light.set_cookie_map_index(NO_INDEX);
        log::debug!("{}: unregistered light, {} total", self.label(), self.culler.registered_count());
        true
    }

    /// Whether a light is a member
    pub fn contains(&self, light: &LightRef) -> bool {
        self.culler.contains(light)
    }

    /// Re-read a member's shadow and cookie textures after they changed
    pub fn refresh_textures(&mut self, light: &LightRef) -> bool {
        let Some(previous) = self.contributions.remove(&key_of(light)) else {
            return false;
        };
        self.withdraw(previous);
        let contribution = self.add_textures(&*light.borrow());
        self.contributions.insert(key_of(light), contribution);
        true
    }

    fn add_textures(&mut self, light: &dyn VolumetricLight) -> Contribution {
        let (shadow, shadow_data) = self.add_shadow_textures(light);
        let cookie = if light.casts_cookie() { offer(&mut self.cookie_maps, light.cookie_texture()) } else { None };
        Contribution { shadow, shadow_data, cookie }
    }

    fn add_shadow_textures(&mut self, light: &dyn VolumetricLight) -> (Option<TextureHandle>, Option<TextureHandle>) {
        if !light.casts_shadows() {
            return (None, None);
        }
        let shadow = offer(&mut self.shadow_maps, light.shadow_texture());
        let shadow_data = self.shadow_data.as_mut().and_then(|data| offer(data, light.shadow_data_texture()));
        (shadow, shadow_data)
    }

    fn still_offered(&self, handle: TextureHandle) -> bool {
        self.contributions.values().any(|contribution| contribution.holds(handle))
    }

    /// Remove the layers of a contribution no longer in `contributions`,
    /// keeping those another member still offers
    fn withdraw(&mut self, contribution: Contribution) {
        let unshared = |handle: Option<TextureHandle>| handle.filter(|&handle| !self.still_offered(handle));
        let (shadow, shadow_data, cookie) =
            (unshared(contribution.shadow), unshared(contribution.shadow_data), unshared(contribution.cookie));

        if let Some(handle) = shadow {
            self.shadow_maps.remove_texture(handle);
        }
        if let (Some(handle), Some(data)) = (shadow_data, self.shadow_data.as_mut()) {
            data.remove_texture(handle);
        }
        if let Some(handle) = cookie {
            self.cookie_maps.remove_texture(handle);
        }
    }

    fn forget_dropped(&mut self, dropped: &[Weak<RefCell<dyn VolumetricLight>>]) {
        for light in dropped {
            if let Some(contribution) = self.contributions.remove(&weak_key_of(light)) {
                self.withdraw(contribution);
            }
        }
    }

    /// Switch the directional cascade configuration
    ///
    /// On a change the shadow map array is resized, every member re-creates
    /// its shadow resources and contributes them again. The returned event
    /// is `None` when nothing changed or for non-directional managers.
    pub fn apply_cascades(
        &mut self,
        backend: &mut dyn GpuBackend,
        cascades: ShadowCascades,
    ) -> GpuResult<Option<ShadowLayoutChanged>> {
        if self.kind != LightKind::Directional || cascades == self.cascades {
            return Ok(None);
        }
        let (width, height) = cascades.shadow_map_extent(self.shadow_resolution);
        let event = ShadowLayoutChanged {
            previous: self.cascades,
            current: cascades,
            shadow_map_width: width,
            shadow_map_height: height,
        };
        self.cascades = cascades;
        self.shadow_maps.resize(width, height, 1);
        if let Some(data) = self.shadow_data.as_mut() {
            data.clear();
        }

        let members: Vec<LightRef> = self.culler.registered_objects().collect();
        for light in &members {
            light.borrow_mut().on_shadow_layout_changed(backend, &event)?;
            let (shadow, shadow_data) = self.add_shadow_textures(&*light.borrow());
            let contribution = self.contributions.entry(key_of(light)).or_default();
            contribution.shadow = shadow;
            contribution.shadow_data = shadow_data;
        }
        log::info!(
            "{}: shadow cascades {:?} -> {:?}, shadow maps {}x{}",
            self.label(),
            event.previous,
            event.current,
            width,
            height
        );
        Ok(Some(event))
    }

    /// Cull, compose and pack this frame's records
    pub fn update(&mut self, backend: &mut dyn GpuBackend, view: &CullingView) -> FogResult<()> {
        let dropped = self.culler.update(view);
        self.forget_dropped(&dropped);
        self.shadow_maps.generate(backend)?;
        if let Some(data) = self.shadow_data.as_mut() {
            data.generate(backend)?;
        }
        self.cookie_maps.generate(backend)?;
        self.parameters.prepare(backend, self.culler.visible_objects_count())?;

        self.visible_shadow_casters = 0;
        self.visible_cookie_casters = 0;
        for entry in self.culler.visible_objects() {
            let mut light = entry.borrow_mut();

            let shadow_index =
                if light.casts_shadows() { index_in(&self.shadow_maps, light.shadow_texture()) } else { NO_INDEX };
            let cookie_index =
                if light.casts_cookie() { index_in(&self.cookie_maps, light.cookie_texture()) } else { NO_INDEX };
            light.set_shadow_map_index(shadow_index);
            light.set_cookie_map_index(cookie_index);
            // Directional casters also need their cascade data layer
            let has_shadow_data = self.shadow_data.as_ref().map_or(true, |data| {
                light.shadow_data_texture().is_some_and(|texture| data.contains(texture.handle))
            });
            if shadow_index != NO_INDEX && has_shadow_data {
                self.visible_shadow_casters += 1;
            }
            if cookie_index != NO_INDEX {
                self.visible_cookie_casters += 1;
            }

            let record = light.parameters();
            if record.kind() != self.kind {
                let category = self.kind.layout().label;
                return Err(CategoryError::ParameterKindMismatch { category, actual: record.kind() }.into());
            }
            record.push_to(&mut self.parameters)?;
        }
        self.parameters.upload(backend)?;

        log::trace!(
            "{}: {} of {} visible, {} shadow, {} cookie",
            self.label(),
            self.culler.visible_objects_count(),
            self.culler.registered_count(),
            self.visible_shadow_casters,
            self.visible_cookie_casters
        );
        Ok(())
    }

    /// Whether any member was visible in the last update
    pub fn has_visible_lights(&self) -> bool {
        self.culler.has_visible_objects()
    }

    /// Whether a visible member had a shadow map layer
    pub const fn has_visible_shadow_casters(&self) -> bool {
        self.visible_shadow_casters > 0
    }

    /// Whether a visible member had a cookie map layer
    pub const fn has_visible_cookie_casters(&self) -> bool {
        self.visible_cookie_casters > 0
    }

    /// Visible member count of the last update
    pub fn visible_count(&self) -> usize {
        self.culler.visible_objects_count()
    }

    /// Registered member count
    pub fn registered_count(&self) -> usize {
        self.culler.registered_count()
    }

    /// Availability for feature resolution
    pub fn category_state(&self) -> CategoryState {
        CategoryState {
            has_visible: self.has_visible_lights(),
            has_shadow_casters: self.has_visible_shadow_casters(),
            has_cookie_casters: self.has_visible_cookie_casters(),
        }
    }

    /// Culler over the members
    pub const fn culler(&self) -> &VisibilityCuller<dyn VolumetricLight> {
        &self.culler
    }

    /// Shadow map array
    pub const fn shadow_maps(&self) -> &ComposedArray {
        &self.shadow_maps
    }

    /// Cascade shadow data array, directional only
    pub const fn shadow_data(&self) -> Option<&ComposedArray> {
        self.shadow_data.as_ref()
    }

    /// Cookie map array
    pub const fn cookie_maps(&self) -> &ComposedArray {
        &self.cookie_maps
    }

    /// Parameter buffer of the last update
    pub const fn parameters(&self) -> &ParameterBuffer {
        &self.parameters
    }

    /// Bind the resources of every enabled feature of this category
    pub fn bind(&self, flags: FeatureFlags, bindings: &mut Bindings) {
        let layout = self.kind.layout();
        if !flags.contains(layout.lights_flag) {
            return;
        }
        if let Some(buffer) = self.parameters.buffer() {
            bindings.buffer(layout.buffer_binding, buffer);
        }
        bindings.int(layout.count_binding, i32::try_from(self.parameters.count()).unwrap_or(i32::MAX));

        if flags.contains(layout.shadows_flag) {
            if let Some(array) = self.shadow_maps.array() {
                bindings.texture(layout.shadow_maps_binding, array);
            }
            let data = self.shadow_data.as_ref().and_then(ComposedArray::array);
            if let (Some(name), Some(data)) = (layout.shadow_data_binding, data) {
                bindings.texture(name, data);
            }
        }
        if flags.contains(layout.cookies_flag) {
            if let Some(array) = self.cookie_maps.array() {
                bindings.texture(layout.cookie_maps_binding, array);
            }
        }
    }

    /// Release GPU resources and forget every member
    pub fn release(&mut self, backend: &mut dyn GpuBackend) {
        self.shadow_maps.release(backend);
        if let Some(data) = self.shadow_data.as_mut() {
            data.release(backend);
        }
        self.cookie_maps.release(backend);
        self.parameters.release(backend);
        self.culler.dispose();
        self.contributions.clear();
    }
}

const fn shadow_extent(kind: LightKind, cascades: ShadowCascades, resolution: u32) -> (u32, u32) {
    match kind {
        LightKind::Directional => cascades.shadow_map_extent(resolution),
        LightKind::Spot | LightKind::Point => (resolution, resolution),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::test_support::{shared, TestLight};
    use crate::foundation::math::Vec3;
    use crate::gpu::HeadlessBackend;

    fn view() -> CullingView {
        CullingView::distance_only(Vec3::zeros(), 50.0)
    }

    #[test]
    fn test_layout_table_matches_kind() {
        for kind in LightKind::ALL {
            assert_eq!(LightManager::new(kind, 64, 32).label(), kind.layout().label);
        }
        assert_eq!(LightKind::Spot.layout().record_stride, std::mem::size_of::<SpotLightParameters>());
        assert!(LightKind::Point.layout().shadow_data_binding.is_none());
    }

    #[test]
    fn test_register_rejects_wrong_kind_and_duplicates() {
        let mut manager = LightManager::new(LightKind::Spot, 64, 32);
        let point: LightRef = shared(TestLight::new(LightKind::Point, Vec3::zeros(), 1.0));
        assert_eq!(
            manager.register(&point),
            Err(CategoryError::KindMismatch { category: "SpotLights", actual: LightKind::Point })
        );

        let spot: LightRef = shared(TestLight::new(LightKind::Spot, Vec3::zeros(), 1.0));
        assert!(manager.register(&spot).is_ok());
        assert_eq!(manager.register(&spot), Err(CategoryError::AlreadyRegistered("SpotLights")));
        assert_eq!(manager.registered_count(), 1);
    }

    #[test]
    fn test_parameter_count_follows_visible_count() {
        let mut backend = HeadlessBackend::new();
        let mut manager = LightManager::new(LightKind::Point, 64, 32);
        let lights: Vec<LightRef> = [5.0, 100.0, 10.0, 200.0]
            .iter()
            .map(|&z| -> LightRef { shared(TestLight::new(LightKind::Point, Vec3::new(0.0, 0.0, z), 1.0)) })
            .collect();
        for light in &lights {
            manager.register(light).unwrap();
        }

        manager.update(&mut backend, &view()).unwrap();
        assert_eq!(manager.visible_count(), 2);
        assert_eq!(manager.parameters().count(), 2);

        manager.unregister(&lights[0]);
        manager.update(&mut backend, &view()).unwrap();
        assert_eq!(manager.parameters().count(), manager.visible_count());
        assert_eq!(manager.parameters().count(), 1);
    }

    #[test]
    fn test_shadow_and_cookie_indices_assigned() {
        let mut backend = HeadlessBackend::new();
        let mut manager = LightManager::new(LightKind::Spot, 64, 32);
        let plain = shared(TestLight::new(LightKind::Spot, Vec3::new(0.0, 0.0, 1.0), 1.0));
        let caster = shared(
            TestLight::new(LightKind::Spot, Vec3::new(0.0, 0.0, 2.0), 1.0)
                .with_shadow(&mut backend, 64, 64)
                .with_cookie(&mut backend, 32),
        );
        let plain_ref: LightRef = plain.clone();
        let caster_ref: LightRef = caster.clone();
        manager.register(&plain_ref).unwrap();
        manager.register(&caster_ref).unwrap();

        manager.update(&mut backend, &view()).unwrap();
        assert_eq!(plain.borrow().shadow_index, NO_INDEX);
        assert_eq!(caster.borrow().shadow_index, 0);
        assert_eq!(caster.borrow().cookie_index, 0);
        assert!(manager.has_visible_shadow_casters());
        assert!(manager.has_visible_cookie_casters());
        assert_eq!(manager.shadow_maps().layer_count(), 1);
    }

    #[test]
    fn test_unregister_withdraws_textures() {
        let mut backend = HeadlessBackend::new();
        let mut manager = LightManager::new(LightKind::Spot, 64, 32);
        let caster = shared(TestLight::new(LightKind::Spot, Vec3::zeros(), 1.0).with_shadow(&mut backend, 64, 64));
        let shadow = caster.borrow().shadow.unwrap().handle;
        let caster_ref: LightRef = caster.clone();
        manager.register(&caster_ref).unwrap();
        manager.update(&mut backend, &view()).unwrap();

        assert!(manager.unregister(&caster_ref));
        assert!(!manager.unregister(&caster_ref));
        assert_eq!(manager.shadow_maps().texture_index(shadow), -1);
        assert_eq!(caster.borrow().shadow_index, NO_INDEX);
    }

    #[test]
    fn test_shared_cookie_survives_first_owner() {
        let mut backend = HeadlessBackend::new();
        let mut manager = LightManager::new(LightKind::Spot, 64, 32);
        let first = shared(TestLight::new(LightKind::Spot, Vec3::new(0.0, 0.0, 1.0), 1.0).with_cookie(&mut backend, 32));
        let cookie = first.borrow().cookie;
        let mut second_light = TestLight::new(LightKind::Spot, Vec3::new(0.0, 0.0, 2.0), 1.0);
        second_light.cookie = cookie;
        let second = shared(second_light);
        let first_ref: LightRef = first.clone();
        let second_ref: LightRef = second.clone();
        manager.register(&first_ref).unwrap();
        manager.register(&second_ref).unwrap();
        assert_eq!(manager.cookie_maps().candidate_count(), 1);

        assert!(manager.unregister(&first_ref));
        manager.update(&mut backend, &view()).unwrap();
        assert_eq!(manager.cookie_maps().candidate_count(), 1);
        assert_eq!(second.borrow().cookie_index, 0);
        assert!(manager.has_visible_cookie_casters());

        assert!(manager.unregister(&second_ref));
        assert_eq!(manager.cookie_maps().candidate_count(), 0);
    }

    #[test]
    fn test_dropped_light_withdraws_its_textures() {
        let mut backend = HeadlessBackend::new();
        let mut manager = LightManager::new(LightKind::Spot, 64, 32);
        let kept: LightRef = shared(TestLight::new(LightKind::Spot, Vec3::new(0.0, 0.0, 1.0), 1.0));
        manager.register(&kept).unwrap();
        {
            let dropped: LightRef = shared(
                TestLight::new(LightKind::Spot, Vec3::new(0.0, 0.0, 2.0), 1.0)
                    .with_shadow(&mut backend, 64, 64)
                    .with_cookie(&mut backend, 32),
            );
            manager.register(&dropped).unwrap();
        }
        assert_eq!(manager.shadow_maps().candidate_count(), 1);

        manager.update(&mut backend, &view()).unwrap();
        assert_eq!(manager.registered_count(), 1);
        assert_eq!(manager.visible_count(), 1);
        assert_eq!(manager.shadow_maps().candidate_count(), 0);
        assert_eq!(manager.cookie_maps().candidate_count(), 0);
        assert!(!manager.has_visible_shadow_casters());
        assert_eq!(manager.contributions.len(), 1);
    }

    #[test]
    fn test_mismatched_shadow_map_is_skipped() {
        let mut backend = HeadlessBackend::new();
        let mut manager = LightManager::new(LightKind::Point, 64, 32);
        let light: LightRef =
            shared(TestLight::new(LightKind::Point, Vec3::zeros(), 1.0).with_shadow(&mut backend, 128, 128));
        manager.register(&light).unwrap();
        manager.update(&mut backend, &view()).unwrap();
        assert_eq!(manager.shadow_maps().candidate_count(), 0);
        assert!(!manager.has_visible_shadow_casters());
        assert_eq!(manager.visible_count(), 1);
    }

    #[test]
    fn test_record_matches_light_parameters() {
        let mut backend = HeadlessBackend::new();
        let mut manager = LightManager::new(LightKind::Point, 64, 32);
        let light = shared(TestLight::new(LightKind::Point, Vec3::new(1.0, 2.0, 3.0), 1.0).with_color([0.5, 0.25, 1.0]));
        let light_ref: LightRef = light.clone();
        manager.register(&light_ref).unwrap();
        manager.update(&mut backend, &view()).unwrap();

        let expected = light.borrow().parameters();
        let buffer = manager.parameters().buffer().unwrap();
        assert_eq!(backend.buffer_contents(buffer).unwrap(), expected.as_bytes());
    }

    #[test]
    fn test_wrong_record_kind_is_fatal() {
        let mut backend = HeadlessBackend::new();
        let mut manager = LightManager::new(LightKind::Spot, 64, 32);
        let light: LightRef = shared(TestLight::new(LightKind::Spot, Vec3::zeros(), 1.0).with_record_kind(LightKind::Point));
        manager.register(&light).unwrap();
        assert!(manager.update(&mut backend, &view()).is_err());
    }

    #[test]
    fn test_cascade_change_resizes_and_notifies() {
        let mut backend = HeadlessBackend::new();
        let mut manager = LightManager::directional(64, 32, ShadowCascades::Four);
        let light = shared(TestLight::directional().with_shadow(&mut backend, 128, 128).with_shadow_data(&mut backend));
        let light_ref: LightRef = light.clone();
        manager.register(&light_ref).unwrap();
        assert_eq!(manager.shadow_maps().candidate_count(), 1);

        assert_eq!(manager.apply_cascades(&mut backend, ShadowCascades::Four).unwrap(), None);
        let event = manager.apply_cascades(&mut backend, ShadowCascades::Two).unwrap().unwrap();
        assert_eq!((event.shadow_map_width, event.shadow_map_height), (128, 64));
        assert_eq!(manager.shadow_maps().element_extent(), [128, 64, 1]);
        assert_eq!(light.borrow().layout_changes, 1);
        assert_eq!(manager.shadow_maps().candidate_count(), 1);
        assert_eq!(manager.shadow_data().unwrap().candidate_count(), 1);

        manager.update(&mut backend, &view()).unwrap();
        assert_eq!(light.borrow().shadow_index, 0);
    }

    #[test]
    fn test_bind_respects_flags() {
        let mut backend = HeadlessBackend::new();
        let mut manager = LightManager::new(LightKind::Spot, 64, 32);
        let light: LightRef = shared(TestLight::new(LightKind::Spot, Vec3::zeros(), 1.0).with_shadow(&mut backend, 64, 64));
        manager.register(&light).unwrap();
        manager.update(&mut backend, &view()).unwrap();

        let mut bindings = Bindings::new();
        manager.bind(FeatureFlags::empty(), &mut bindings);
        assert!(bindings.is_empty());

        manager.bind(FeatureFlags::SPOT_LIGHTS, &mut bindings);
        assert!(bindings.contains(names::SPOT_LIGHTS_BUFFER));
        assert!(!bindings.contains(names::SPOT_SHADOW_MAPS));

        manager.bind(FeatureFlags::SPOT_LIGHTS | FeatureFlags::SPOT_SHADOWS, &mut bindings);
        assert!(bindings.contains(names::SPOT_SHADOW_MAPS));
    }
}
