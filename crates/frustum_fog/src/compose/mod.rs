//! Composition of per-object GPU data
//!
//! - [`ComposedArray`]: per-object textures gathered into one indexed array
//! - [`ParameterBuffer`]: per-object records gathered into one structured buffer

mod composed_array;
mod parameter_buffer;

pub use composed_array::{ArrayLayout, ComposeError, ComposedArray, SourceTexture};
pub use parameter_buffer::ParameterBuffer;
