//! Backend abstraction traits for the GPU side of the volumetric pipeline
//!
//! This module defines the trait that GPU backends must implement so the
//! orchestration can allocate volume textures, compose texture arrays, upload
//! parameter buffers and dispatch kernels without knowing which graphics API
//! sits underneath.

use thiserror::Error;

use super::kernel::{Dispatch, Kernel};

/// Result type for backend operations
pub type GpuResult<T> = Result<T, GpuError>;

/// Handle to a texture resource stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a structured buffer stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Texel formats used by the volumetric resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Single channel 8-bit (cookies)
    R8Unorm,
    /// Four channel 8-bit (volume masks)
    Rgba8Unorm,
    /// Single channel 16-bit float (occlusion depth)
    R16Float,
    /// Single channel 32-bit float (shadow maps)
    R32Float,
    /// Four channel 16-bit float (lighting and fog volumes)
    Rgba16Float,
    /// Four channel 32-bit float (cascade shadow data)
    Rgba32Float,
}

impl TextureFormat {
    /// Bytes per texel
    pub const fn bytes_per_texel(self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::R16Float => 2,
            Self::Rgba8Unorm | Self::R32Float => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }
}

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    /// Plain 2D texture
    D2,
    /// Layered 2D texture array
    D2Array,
    /// Volume texture
    D3,
}

/// Shape and format of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Depth for 3D textures, layer count for arrays, 1 otherwise
    pub depth_or_layers: u32,
    /// Dimensionality
    pub dimension: TextureDimension,
    /// Texel format
    pub format: TextureFormat,
}

impl TextureDescriptor {
    /// Describe a 2D texture
    pub const fn d2(width: u32, height: u32, format: TextureFormat) -> Self {
        Self { width, height, depth_or_layers: 1, dimension: TextureDimension::D2, format }
    }

    /// Describe a layered 2D texture array
    pub const fn d2_array(width: u32, height: u32, layers: u32, format: TextureFormat) -> Self {
        Self { width, height, depth_or_layers: layers, dimension: TextureDimension::D2Array, format }
    }

    /// Describe a volume texture
    pub const fn d3(width: u32, height: u32, depth: u32, format: TextureFormat) -> Self {
        Self { width, height, depth_or_layers: depth, dimension: TextureDimension::D3, format }
    }

    /// Approximate size in bytes, used for allocation logging
    pub const fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth_or_layers as u64
            * self.format.bytes_per_texel() as u64
    }
}

/// Destination of a texture copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureOrigin {
    /// X offset in texels
    pub x: u32,
    /// Y offset in texels
    pub y: u32,
    /// Z offset in texels (volume atlases)
    pub z: u32,
    /// Array layer (layered arrays)
    pub layer: u32,
}

impl TextureOrigin {
    /// Origin of an array layer
    pub const fn layer(layer: u32) -> Self {
        Self { x: 0, y: 0, z: 0, layer }
    }

    /// Origin of a z-slab inside a volume atlas
    pub const fn depth_offset(z: u32) -> Self {
        Self { x: 0, y: 0, z, layer: 0 }
    }
}

/// GPU backend errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GpuError {
    /// The texture handle does not name a live texture
    #[error("Unknown or released texture: {0:?}")]
    UnknownTexture(TextureHandle),

    /// The buffer handle does not name a live buffer
    #[error("Unknown or released buffer: {0:?}")]
    UnknownBuffer(BufferHandle),

    /// Resource creation failed
    #[error("Resource allocation failed: {0}")]
    AllocationFailed(String),

    /// A copy between incompatible textures was requested
    #[error("Invalid texture copy: {0}")]
    InvalidCopy(String),

    /// A buffer write did not fit the buffer or its stride
    #[error("Invalid buffer write: {0}")]
    InvalidBufferWrite(String),

    /// A kernel entry point was dispatched without a required binding
    #[error("Kernel {kernel:?} is missing required binding '{name}'")]
    MissingBinding {
        /// Kernel being dispatched
        kernel: Kernel,
        /// Name of the missing binding
        name: &'static str,
    },

    /// A texture is bound both as input and output of one dispatch
    #[error("Texture bound as '{input}' is also the output '{output}' of the same dispatch")]
    ReadWriteHazard {
        /// Input binding name
        input: &'static str,
        /// Output binding name
        output: &'static str,
    },

    /// The backend rejected the dispatch
    #[error("Dispatch of {kernel:?} failed: {reason}")]
    DispatchFailed {
        /// Kernel being dispatched
        kernel: Kernel,
        /// Backend-provided reason
        reason: String,
    },
}

/// GPU backend trait
///
/// Dispatches are fire-and-forget: the orchestration never waits on the GPU
/// and relies on double buffering to avoid read/write hazards.
pub trait GpuBackend {
    /// Create a texture
    fn create_texture(&mut self, descriptor: &TextureDescriptor, label: &str) -> GpuResult<TextureHandle>;

    /// Release a texture
    fn release_texture(&mut self, handle: TextureHandle) -> GpuResult<()>;

    /// Look up the descriptor of a live texture
    fn texture_descriptor(&self, handle: TextureHandle) -> Option<TextureDescriptor>;

    /// Copy a whole source texture into a destination at `origin`
    fn copy_texture(&mut self, source: TextureHandle, destination: TextureHandle, origin: TextureOrigin) -> GpuResult<()>;

    /// Fill every texel of a texture with `value`
    fn clear_texture(&mut self, handle: TextureHandle, value: [f32; 4]) -> GpuResult<()>;

    /// Create a structured buffer of `count` elements of `stride` bytes
    fn create_buffer(&mut self, count: usize, stride: usize, label: &str) -> GpuResult<BufferHandle>;

    /// Release a structured buffer
    fn release_buffer(&mut self, handle: BufferHandle) -> GpuResult<()>;

    /// Write bytes into a buffer starting at `offset`
    fn write_buffer(&mut self, handle: BufferHandle, offset: usize, data: &[u8]) -> GpuResult<()>;

    /// Dispatch a kernel entry point with its bindings
    fn dispatch(&mut self, dispatch: &Dispatch) -> GpuResult<()>;
}

/// Release a texture, treating an already released handle as clean state
pub fn release_texture_quietly(backend: &mut dyn GpuBackend, handle: TextureHandle) {
    match backend.release_texture(handle) {
        Ok(()) => {}
        Err(GpuError::UnknownTexture(_)) => {
            log::debug!("GpuBackend: texture {:?} was already released", handle);
        }
        Err(e) => {
            log::warn!("GpuBackend: releasing texture {:?} failed: {}", handle, e);
        }
    }
}

/// Release a buffer, treating an already released handle as clean state
pub fn release_buffer_quietly(backend: &mut dyn GpuBackend, handle: BufferHandle) {
    match backend.release_buffer(handle) {
        Ok(()) => {}
        Err(GpuError::UnknownBuffer(_)) => {
            log::debug!("GpuBackend: buffer {:?} was already released", handle);
        }
        Err(e) => {
            log::warn!("GpuBackend: releasing buffer {:?} failed: {}", handle, e);
        }
    }
}
