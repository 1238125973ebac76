//! In-memory GPU backend
//!
//! Tracks textures and buffers in slot maps, enforces the kernel dispatch
//! contract and records every call. Used by the demo and the tests; a real
//! backend implements the same [`GpuBackend`] trait on top of a graphics API.

use crate::foundation::collections::{handle_to_id, id_to_handle, HandleMap};

use super::backend::{
    BufferHandle, GpuBackend, GpuError, GpuResult, TextureDescriptor, TextureDimension, TextureHandle,
    TextureOrigin,
};
use super::kernel::{Binding, Dispatch, Kernel};

#[derive(Debug, Clone)]
struct TextureRecord {
    descriptor: TextureDescriptor,
    label: String,
    clear_value: Option<[f32; 4]>,
}

#[derive(Debug, Clone)]
struct BufferRecord {
    stride: usize,
    bytes: Vec<u8>,
    label: String,
}

/// Counters accumulated over the backend lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Textures created
    pub textures_created: u64,
    /// Textures released
    pub textures_released: u64,
    /// Buffers created
    pub buffers_created: u64,
    /// Buffers released
    pub buffers_released: u64,
    /// Texture copies performed
    pub copies: u64,
    /// Texture clears performed
    pub clears: u64,
    /// Buffer writes performed
    pub buffer_writes: u64,
    /// Kernel dispatches accepted
    pub dispatches: u64,
}

/// Headless GPU backend
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    textures: HandleMap<TextureRecord>,
    buffers: HandleMap<BufferRecord>,
    dispatches: Vec<Dispatch>,
    stats: BackendStats,
    fail_kernel: Option<Kernel>,
}

impl HeadlessBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every dispatch of `kernel` fail, to exercise fatal frame errors
    pub fn fail_kernel(&mut self, kernel: Option<Kernel>) {
        self.fail_kernel = kernel;
    }

    /// Lifetime counters
    pub const fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Number of live textures
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Number of live buffers
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Every dispatch accepted so far, oldest first
    pub fn dispatches(&self) -> &[Dispatch] {
        &self.dispatches
    }

    /// Forget the recorded dispatches
    pub fn clear_dispatch_log(&mut self) {
        self.dispatches.clear();
    }

    /// Contents of a live buffer
    pub fn buffer_contents(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(id_to_handle(handle.0)).map(|b| b.bytes.as_slice())
    }

    /// Element stride of a live buffer
    pub fn buffer_stride(&self, handle: BufferHandle) -> Option<usize> {
        self.buffers.get(id_to_handle(handle.0)).map(|b| b.stride)
    }

    /// Label given to a live texture at creation
    pub fn texture_label(&self, handle: TextureHandle) -> Option<&str> {
        self.textures.get(id_to_handle(handle.0)).map(|t| t.label.as_str())
    }

    /// Label given to a live buffer at creation
    pub fn buffer_label(&self, handle: BufferHandle) -> Option<&str> {
        self.buffers.get(id_to_handle(handle.0)).map(|b| b.label.as_str())
    }

    /// Last value a live texture was cleared to
    pub fn texture_clear_value(&self, handle: TextureHandle) -> Option<[f32; 4]> {
        self.textures.get(id_to_handle(handle.0)).and_then(|t| t.clear_value)
    }

    fn texture(&self, handle: TextureHandle) -> GpuResult<&TextureRecord> {
        self.textures.get(id_to_handle(handle.0)).ok_or(GpuError::UnknownTexture(handle))
    }

    fn check_bound_resources(&self, dispatch: &Dispatch) -> GpuResult<()> {
        for (_, binding) in dispatch.bindings.iter() {
            match *binding {
                Binding::Texture(handle) | Binding::StorageTexture(handle) => {
                    self.texture(handle)?;
                }
                Binding::Buffer(handle) => {
                    if !self.buffers.contains_key(id_to_handle(handle.0)) {
                        return Err(GpuError::UnknownBuffer(handle));
                    }
                }
                Binding::Int(_) | Binding::Float(_) | Binding::Vec4(_) | Binding::Mat4(_) => {}
            }
        }
        Ok(())
    }
}

fn copy_fits(source: &TextureDescriptor, destination: &TextureDescriptor, origin: TextureOrigin) -> bool {
    let fits_plane = origin.x + source.width <= destination.width && origin.y + source.height <= destination.height;
    match destination.dimension {
        TextureDimension::D2 => fits_plane && origin.layer == 0 && source.depth_or_layers == 1,
        TextureDimension::D2Array => fits_plane && origin.layer + source.depth_or_layers <= destination.depth_or_layers,
        TextureDimension::D3 => fits_plane && origin.z + source.depth_or_layers <= destination.depth_or_layers,
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_texture(&mut self, descriptor: &TextureDescriptor, label: &str) -> GpuResult<TextureHandle> {
        if descriptor.width == 0 || descriptor.height == 0 || descriptor.depth_or_layers == 0 {
            return Err(GpuError::AllocationFailed(format!("'{}' has an empty extent: {:?}", label, descriptor)));
        }
        let key = self.textures.insert(TextureRecord {
            descriptor: *descriptor,
            label: label.to_string(),
            clear_value: None,
        });
        self.stats.textures_created += 1;
        log::trace!("HeadlessBackend: created texture '{}' ({} bytes)", label, descriptor.byte_size());
        Ok(TextureHandle(handle_to_id(key)))
    }

    fn release_texture(&mut self, handle: TextureHandle) -> GpuResult<()> {
        self.textures
            .remove(id_to_handle(handle.0))
            .ok_or(GpuError::UnknownTexture(handle))?;
        self.stats.textures_released += 1;
        Ok(())
    }

    fn texture_descriptor(&self, handle: TextureHandle) -> Option<TextureDescriptor> {
        self.textures.get(id_to_handle(handle.0)).map(|t| t.descriptor)
    }

    fn copy_texture(&mut self, source: TextureHandle, destination: TextureHandle, origin: TextureOrigin) -> GpuResult<()> {
        let src = self.texture(source)?.descriptor;
        let dst = self.texture(destination)?.descriptor;
        if src.format != dst.format {
            return Err(GpuError::InvalidCopy(format!("format {:?} into {:?}", src.format, dst.format)));
        }
        if !copy_fits(&src, &dst, origin) {
            return Err(GpuError::InvalidCopy(format!("{:?} does not fit {:?} at {:?}", src, dst, origin)));
        }
        self.stats.copies += 1;
        Ok(())
    }

    fn clear_texture(&mut self, handle: TextureHandle, value: [f32; 4]) -> GpuResult<()> {
        let record = self
            .textures
            .get_mut(id_to_handle(handle.0))
            .ok_or(GpuError::UnknownTexture(handle))?;
        record.clear_value = Some(value);
        self.stats.clears += 1;
        Ok(())
    }

    fn create_buffer(&mut self, count: usize, stride: usize, label: &str) -> GpuResult<BufferHandle> {
        if count == 0 || stride == 0 {
            return Err(GpuError::AllocationFailed(format!("'{}' has no elements", label)));
        }
        let key = self.buffers.insert(BufferRecord {
            stride,
            bytes: vec![0; count * stride],
            label: label.to_string(),
        });
        self.stats.buffers_created += 1;
        Ok(BufferHandle(handle_to_id(key)))
    }

    fn release_buffer(&mut self, handle: BufferHandle) -> GpuResult<()> {
        self.buffers
            .remove(id_to_handle(handle.0))
            .ok_or(GpuError::UnknownBuffer(handle))?;
        self.stats.buffers_released += 1;
        Ok(())
    }

    fn write_buffer(&mut self, handle: BufferHandle, offset: usize, data: &[u8]) -> GpuResult<()> {
        let record = self
            .buffers
            .get_mut(id_to_handle(handle.0))
            .ok_or(GpuError::UnknownBuffer(handle))?;
        let end = offset + data.len();
        if end > record.bytes.len() {
            return Err(GpuError::InvalidBufferWrite(format!(
                "{} bytes at offset {} overflow '{}' ({} bytes)",
                data.len(),
                offset,
                record.label,
                record.bytes.len()
            )));
        }
        record.bytes[offset..end].copy_from_slice(data);
        self.stats.buffer_writes += 1;
        Ok(())
    }

    fn dispatch(&mut self, dispatch: &Dispatch) -> GpuResult<()> {
        if self.fail_kernel == Some(dispatch.kernel) {
            return Err(GpuError::DispatchFailed {
                kernel: dispatch.kernel,
                reason: "failure injected".to_string(),
            });
        }
        dispatch.validate()?;
        self.check_bound_resources(dispatch)?;
        if dispatch.groups.contains(&0) {
            return Err(GpuError::DispatchFailed {
                kernel: dispatch.kernel,
                reason: format!("empty thread group count {:?}", dispatch.groups),
            });
        }
        log::trace!("HeadlessBackend: dispatch {} {:?}", dispatch.entry_point_name(), dispatch.groups);
        self.dispatches.push(dispatch.clone());
        self.stats.dispatches += 1;
        Ok(())
    }
}
