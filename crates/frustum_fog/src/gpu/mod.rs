//! GPU collaborator interface
//!
//! The kernels run outside this crate. Everything the orchestration needs from
//! the GPU goes through [`GpuBackend`]:
//!
//! ```text
//! Category managers ──► ComposedArray / ParameterBuffer ──┐
//!                                                          ├──► GpuBackend
//! Frustum (volume textures, DoubleBuffer) ──► Dispatch ────┘
//! ```

pub mod backend;
pub mod double_buffer;
pub mod headless;
pub mod kernel;

pub use backend::{
    release_buffer_quietly, release_texture_quietly, BufferHandle, GpuBackend, GpuError, GpuResult,
    TextureDescriptor, TextureDimension, TextureFormat, TextureHandle, TextureOrigin,
};
pub use double_buffer::DoubleBuffer;
pub use headless::{BackendStats, HeadlessBackend};
pub use kernel::{names, Binding, Bindings, Dispatch, Kernel};
