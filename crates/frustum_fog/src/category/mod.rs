//! Object categories
//!
//! Each manager binds a [`VisibilityCuller`](crate::culling::VisibilityCuller)
//! to the composed arrays and the parameter buffer of one category, and
//! produces one upload-ready buffer per frame. Buffer rows and texture
//! indices handed to objects are valid for the current frame only; no caller
//! may keep one across an update.

mod error;
mod light;
pub mod records;
mod set;
mod volume;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::CategoryError;
pub use light::{
    CategoryLayout, LightKind, LightManager, LightParameters, LightRef, ShadowLayoutChanged, VolumetricLight,
    CASCADE_DATA_EXTENT, CASCADE_DATA_FORMAT,
};
pub use set::{CategorySet, VisibleCounts};
pub use volume::{VolumeManager, VolumeRef, VolumetricVolume, VOLUME_MASK_FORMAT};
