//! Texture arrays composed from a dynamic list of same-shaped sources
//!
//! A composed array is the only way a kernel can reach per-object textures
//! (shadow maps, cookies, volume masks): each source is copied into the layer
//! matching its position in the candidate list. That position is the source's
//! index and is only valid until the next [`ComposedArray::generate`].

use thiserror::Error;

use crate::gpu::{
    release_texture_quietly, GpuBackend, GpuResult, TextureDescriptor, TextureDimension, TextureFormat,
    TextureHandle, TextureOrigin,
};

/// A texture offered to a composed array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceTexture {
    /// Backend handle of the source
    pub handle: TextureHandle,
    /// Shape and format of the source
    pub descriptor: TextureDescriptor,
}

impl SourceTexture {
    /// Pair a handle with its descriptor
    pub const fn new(handle: TextureHandle, descriptor: TextureDescriptor) -> Self {
        Self { handle, descriptor }
    }
}

/// How candidates are laid out in the composed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLayout {
    /// 2D sources, one array layer each
    Layered2D,
    /// Cubic 3D sources stacked along z in a volume atlas
    Stacked3D,
}

/// Configuration errors raised when offering a source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// Source extent differs from the element extent
    #[error("{label}: source is {actual:?}, elements are {expected:?}")]
    SizeMismatch {
        /// Array label
        label: &'static str,
        /// Required element extent
        expected: [u32; 3],
        /// Offered source extent
        actual: [u32; 3],
    },

    /// Source format differs from the element format
    #[error("{label}: source format {actual:?}, elements are {expected:?}")]
    FormatMismatch {
        /// Array label
        label: &'static str,
        /// Required element format
        expected: TextureFormat,
        /// Offered source format
        actual: TextureFormat,
    },

    /// Source dimensionality does not match the layout
    #[error("{label}: source dimension {actual:?}, layout needs {expected:?}")]
    DimensionMismatch {
        /// Array label
        label: &'static str,
        /// Required source dimension
        expected: TextureDimension,
        /// Offered source dimension
        actual: TextureDimension,
    },
}

/// Fixed-shape array built lazily from an ordered candidate list
pub struct ComposedArray {
    label: &'static str,
    layout: ArrayLayout,
    width: u32,
    height: u32,
    depth: u32,
    format: TextureFormat,
    candidates: Vec<SourceTexture>,
    needs_rebuild: bool,
    always_rebuild: bool,
    allocated: Option<(TextureHandle, TextureDescriptor)>,
    revision: u64,
}

impl ComposedArray {
    /// Array of 2D elements
    pub fn layered_2d(label: &'static str, width: u32, height: u32, format: TextureFormat) -> Self {
        Self::new(label, ArrayLayout::Layered2D, width, height, 1, format)
    }

    /// Atlas of cubic 3D elements
    pub fn stacked_3d(label: &'static str, size: u32, format: TextureFormat) -> Self {
        Self::new(label, ArrayLayout::Stacked3D, size, size, size, format)
    }

    fn new(label: &'static str, layout: ArrayLayout, width: u32, height: u32, depth: u32, format: TextureFormat) -> Self {
        Self {
            label,
            layout,
            width,
            height,
            depth,
            format,
            candidates: Vec::new(),
            needs_rebuild: false,
            always_rebuild: false,
            allocated: None,
            revision: 0,
        }
    }

    /// Copy every candidate on every [`generate`](Self::generate), for sources whose content changes each frame
    pub fn with_always_rebuild(mut self, always_rebuild: bool) -> Self {
        self.always_rebuild = always_rebuild;
        self
    }

    /// Array label used in logs and resource names
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Element extent `[width, height, depth]`
    pub const fn element_extent(&self) -> [u32; 3] {
        [self.width, self.height, self.depth]
    }

    /// Element format
    pub const fn format(&self) -> TextureFormat {
        self.format
    }

    fn check_source(&self, texture: &SourceTexture) -> Result<(), ComposeError> {
        let descriptor = &texture.descriptor;
        let expected_dimension = match self.layout {
            ArrayLayout::Layered2D => TextureDimension::D2,
            ArrayLayout::Stacked3D => TextureDimension::D3,
        };
        if descriptor.dimension != expected_dimension {
            return Err(ComposeError::DimensionMismatch {
                label: self.label,
                expected: expected_dimension,
                actual: descriptor.dimension,
            });
        }
        let actual = [descriptor.width, descriptor.height, descriptor.depth_or_layers];
        if actual != self.element_extent() {
            return Err(ComposeError::SizeMismatch { label: self.label, expected: self.element_extent(), actual });
        }
        if descriptor.format != self.format {
            return Err(ComposeError::FormatMismatch { label: self.label, expected: self.format, actual: descriptor.format });
        }
        Ok(())
    }

    /// Offer a source; `Ok(false)` for duplicates, `Err` for shape or format mismatches
    pub fn add_texture(&mut self, texture: SourceTexture) -> Result<bool, ComposeError> {
        if self.contains(texture.handle) {
            return Ok(false);
        }
        self.check_source(&texture)?;
        self.candidates.push(texture);
        self.needs_rebuild = true;
        Ok(true)
    }

    /// Withdraw a source; `false` if it was not a candidate
    pub fn remove_texture(&mut self, handle: TextureHandle) -> bool {
        let Some(position) = self.candidates.iter().position(|c| c.handle == handle) else {
            return false;
        };
        self.candidates.remove(position);
        self.needs_rebuild = true;
        true
    }

    /// Drop every candidate
    pub fn clear(&mut self) {
        if !self.candidates.is_empty() {
            self.candidates.clear();
            self.needs_rebuild = true;
        }
    }

    /// Whether a source is a candidate
    pub fn contains(&self, handle: TextureHandle) -> bool {
        self.candidates.iter().any(|c| c.handle == handle)
    }

    /// Candidate list position of a source, `-1` if absent
    pub fn texture_index(&self, handle: TextureHandle) -> i32 {
        self.candidates
            .iter()
            .position(|c| c.handle == handle)
            .map_or(-1, |index| index as i32)
    }

    /// Number of candidates
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the next [`generate`](Self::generate) will rebuild
    pub const fn needs_rebuild(&self) -> bool {
        self.needs_rebuild || self.always_rebuild
    }

    /// Change the element extent; clears the candidate list and forces a rebuild
    pub fn resize(&mut self, width: u32, height: u32, depth: u32) {
        self.width = width;
        self.height = height;
        self.depth = match self.layout {
            ArrayLayout::Layered2D => 1,
            ArrayLayout::Stacked3D => depth,
        };
        self.candidates.clear();
        self.needs_rebuild = true;
        log::debug!("{}: resized elements to {:?}", self.label, self.element_extent());
    }

    fn array_descriptor(&self) -> TextureDescriptor {
        let count = self.candidates.len() as u32;
        match self.layout {
            ArrayLayout::Layered2D => TextureDescriptor::d2_array(self.width, self.height, count, self.format),
            ArrayLayout::Stacked3D => TextureDescriptor::d3(self.width, self.height, self.depth * count, self.format),
        }
    }

    const fn origin_of(&self, index: u32) -> TextureOrigin {
        match self.layout {
            ArrayLayout::Layered2D => TextureOrigin::layer(index),
            ArrayLayout::Stacked3D => TextureOrigin::depth_offset(index * self.depth),
        }
    }

    /// Rebuild the array if dirty (or always rebuilding); returns `true` when rebuilt
    ///
    /// A rebuild bumps [`revision`](Self::revision); dependents caching indices
    /// compare it to know their indices need refreshing.
    pub fn generate(&mut self, backend: &mut dyn GpuBackend) -> GpuResult<bool> {
        if !self.needs_rebuild() {
            return Ok(false);
        }

        if self.candidates.is_empty() {
            if let Some((handle, _)) = self.allocated.take() {
                release_texture_quietly(backend, handle);
            }
        } else {
            let descriptor = self.array_descriptor();
            let handle = match self.allocated {
                Some((handle, current)) if current == descriptor => handle,
                _ => {
                    if let Some((old, _)) = self.allocated.take() {
                        release_texture_quietly(backend, old);
                    }
                    let handle = backend.create_texture(&descriptor, self.label)?;
                    log::debug!("{}: allocated {} element(s)", self.label, self.candidates.len());
                    self.allocated = Some((handle, descriptor));
                    handle
                }
            };
            for (index, candidate) in self.candidates.iter().enumerate() {
                backend.copy_texture(candidate.handle, handle, self.origin_of(index as u32))?;
            }
        }

        self.needs_rebuild = false;
        self.revision += 1;
        Ok(true)
    }

    /// Composed resource, `None` while the candidate list is empty
    pub fn array(&self) -> Option<TextureHandle> {
        self.allocated.map(|(handle, _)| handle)
    }

    /// Number of elements in the composed resource
    pub fn layer_count(&self) -> usize {
        self.allocated.map_or(0, |(_, descriptor)| match self.layout {
            ArrayLayout::Layered2D => descriptor.depth_or_layers as usize,
            ArrayLayout::Stacked3D => (descriptor.depth_or_layers / self.depth.max(1)) as usize,
        })
    }

    /// Rebuild counter
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Release the composed resource; candidates are kept
    pub fn release(&mut self, backend: &mut dyn GpuBackend) {
        if let Some((handle, _)) = self.allocated.take() {
            release_texture_quietly(backend, handle);
        }
        self.needs_rebuild = !self.candidates.is_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessBackend;

    fn source(backend: &mut HeadlessBackend, descriptor: TextureDescriptor) -> SourceTexture {
        SourceTexture::new(backend.create_texture(&descriptor, "source").unwrap(), descriptor)
    }

    fn shadow(backend: &mut HeadlessBackend) -> SourceTexture {
        source(backend, TextureDescriptor::d2(64, 64, TextureFormat::R32Float))
    }

    #[test]
    fn test_indices_follow_candidate_order() {
        let mut backend = HeadlessBackend::new();
        let mut array = ComposedArray::layered_2d("ShadowMaps", 64, 64, TextureFormat::R32Float);
        let sources: Vec<_> = (0..3).map(|_| shadow(&mut backend)).collect();
        for s in &sources {
            assert_eq!(array.add_texture(*s), Ok(true));
        }
        assert!(array.generate(&mut backend).unwrap());

        assert_eq!(array.layer_count(), 3);
        for (i, s) in sources.iter().enumerate() {
            assert_eq!(array.texture_index(s.handle), i as i32);
        }
        let stranger = shadow(&mut backend);
        assert_eq!(array.texture_index(stranger.handle), -1);
    }

    #[test]
    fn test_duplicates_rejected_without_dirtying() {
        let mut backend = HeadlessBackend::new();
        let mut array = ComposedArray::layered_2d("ShadowMaps", 64, 64, TextureFormat::R32Float);
        let s = shadow(&mut backend);
        array.add_texture(s).unwrap();
        array.generate(&mut backend).unwrap();
        assert_eq!(array.add_texture(s), Ok(false));
        assert!(!array.needs_rebuild());
        assert_eq!(array.candidate_count(), 1);
    }

    #[test]
    fn test_mismatches_are_errors() {
        let mut backend = HeadlessBackend::new();
        let mut array = ComposedArray::layered_2d("CookieMaps", 64, 64, TextureFormat::R8Unorm);
        let wrong_size = source(&mut backend, TextureDescriptor::d2(32, 64, TextureFormat::R8Unorm));
        let wrong_format = source(&mut backend, TextureDescriptor::d2(64, 64, TextureFormat::R32Float));
        let wrong_dimension = source(&mut backend, TextureDescriptor::d3(64, 64, 1, TextureFormat::R8Unorm));

        assert!(matches!(array.add_texture(wrong_size), Err(ComposeError::SizeMismatch { .. })));
        assert!(matches!(array.add_texture(wrong_format), Err(ComposeError::FormatMismatch { .. })));
        assert!(matches!(array.add_texture(wrong_dimension), Err(ComposeError::DimensionMismatch { .. })));
        assert_eq!(array.candidate_count(), 0);
    }

    #[test]
    fn test_generate_is_lazy_unless_always_rebuild() {
        let mut backend = HeadlessBackend::new();
        let mut lazy = ComposedArray::layered_2d("CookieMaps", 64, 64, TextureFormat::R32Float);
        let mut eager = ComposedArray::layered_2d("ShadowMaps", 64, 64, TextureFormat::R32Float).with_always_rebuild(true);
        let s = shadow(&mut backend);
        lazy.add_texture(s).unwrap();
        eager.add_texture(s).unwrap();

        assert!(lazy.generate(&mut backend).unwrap());
        assert!(!lazy.generate(&mut backend).unwrap());
        assert!(eager.generate(&mut backend).unwrap());
        assert!(eager.generate(&mut backend).unwrap());
        assert_eq!(lazy.revision(), 1);
        assert_eq!(eager.revision(), 2);
        // Same count: the eager array is reused, not reallocated
        assert_eq!(backend.stats().textures_created, 3);
    }

    #[test]
    fn test_remove_reindexes_and_reallocates() {
        let mut backend = HeadlessBackend::new();
        let mut array = ComposedArray::layered_2d("ShadowMaps", 64, 64, TextureFormat::R32Float);
        let a = shadow(&mut backend);
        let b = shadow(&mut backend);
        array.add_texture(a).unwrap();
        array.add_texture(b).unwrap();
        array.generate(&mut backend).unwrap();
        let first_array = array.array().unwrap();

        assert!(array.remove_texture(a.handle));
        assert!(!array.remove_texture(a.handle));
        array.generate(&mut backend).unwrap();

        assert_eq!(array.texture_index(a.handle), -1);
        assert_eq!(array.texture_index(b.handle), 0);
        assert_eq!(array.layer_count(), 1);
        assert_ne!(array.array(), Some(first_array));
        assert!(backend.texture_descriptor(first_array).is_none());
    }

    #[test]
    fn test_empty_list_releases_array() {
        let mut backend = HeadlessBackend::new();
        let mut array = ComposedArray::layered_2d("ShadowMaps", 64, 64, TextureFormat::R32Float);
        let s = shadow(&mut backend);
        array.add_texture(s).unwrap();
        array.generate(&mut backend).unwrap();
        array.remove_texture(s.handle);
        array.generate(&mut backend).unwrap();

        assert!(array.array().is_none());
        assert_eq!(array.layer_count(), 0);
        assert_eq!(backend.live_textures(), 1);
    }

    #[test]
    fn test_resize_clears_candidates() {
        let mut backend = HeadlessBackend::new();
        let mut array = ComposedArray::layered_2d("ShadowMaps", 64, 64, TextureFormat::R32Float);
        let s = shadow(&mut backend);
        array.add_texture(s).unwrap();
        array.generate(&mut backend).unwrap();

        array.resize(128, 64, 1);
        assert_eq!(array.candidate_count(), 0);
        assert!(array.needs_rebuild());
        assert!(matches!(array.add_texture(s), Err(ComposeError::SizeMismatch { .. })));
        let wide = source(&mut backend, TextureDescriptor::d2(128, 64, TextureFormat::R32Float));
        assert_eq!(array.add_texture(wide), Ok(true));
    }

    #[test]
    fn test_stacked_3d_layout_offsets_by_element_depth() {
        let mut backend = HeadlessBackend::new();
        let mut masks = ComposedArray::stacked_3d("VolumeMasks", 16, TextureFormat::Rgba8Unorm);
        for _ in 0..3 {
            let mask = source(&mut backend, TextureDescriptor::d3(16, 16, 16, TextureFormat::Rgba8Unorm));
            masks.add_texture(mask).unwrap();
        }
        masks.generate(&mut backend).unwrap();

        let descriptor = backend.texture_descriptor(masks.array().unwrap()).unwrap();
        assert_eq!(descriptor.depth_or_layers, 48);
        assert_eq!(masks.layer_count(), 3);
        assert_eq!(backend.stats().copies, 3);
    }
}
