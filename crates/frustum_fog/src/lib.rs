//! # Frustum Fog
//!
//! CPU-side orchestration of frustum-aligned volumetric lighting and fog.
//!
//! ## Features
//!
//! - **Visibility Culling**: Bounding-sphere culling per object category
//! - **Texture Composition**: Per-object shadow maps, cookies and volume masks gathered into indexed arrays
//! - **Parameter Packing**: One structured buffer of fixed-stride records per category
//! - **Feature Resolution**: User toggles and runtime availability folded into one kernel variant
//! - **Temporal Reprojection**: Double-buffered lighting volume with validated history
//!
//! The compute kernels themselves run behind [`gpu::GpuBackend`]; a
//! [`gpu::HeadlessBackend`] records every allocation and dispatch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frustum_fog::prelude::*;
//!
//! fn main() -> Result<(), FogError> {
//!     let settings = FogSettings::default();
//!     let mut backend = HeadlessBackend::new();
//!     let mut categories = CategorySet::new(&settings);
//!     let mut frustum = Frustum::new(settings)?;
//!
//!     let camera = CameraView::perspective(
//!         Vec3::new(0.0, 2.0, 10.0),
//!         Vec3::zeros(),
//!         Vec3::y(),
//!         1.0,
//!         16.0 / 9.0,
//!         0.1,
//!         200.0,
//!     );
//!     let report = frustum.render_frame(&mut backend, &mut categories, &FrameInput::new(camera, 0.0))?;
//!     println!("{:?}", report.flags);
//!
//!     frustum.release(&mut backend);
//!     categories.release(&mut backend);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod gpu;
pub mod culling;
pub mod compose;
pub mod features;
pub mod category;
pub mod config;
pub mod frustum;

mod error;

pub use error::{FogError, FogResult};

/// Common imports for fog users
pub mod prelude {
    pub use crate::{
        FogError, FogResult,
        foundation::{
            math::{Mat4, Vec3},
            time::Timer,
        },
        gpu::{GpuBackend, HeadlessBackend, TextureHandle},
        culling::{BoundingSphere, Cullable, Shared},
        compose::SourceTexture,
        features::{FeatureFlags, FeatureToggles, ShadowCascades},
        category::{
            records, CategorySet, LightKind, LightParameters, LightRef, ShadowLayoutChanged, VolumeRef,
            VolumetricLight, VolumetricVolume,
        },
        config::{Config, FogSettings},
        frustum::{CameraView, FrameInput, FrameReport, Frustum, GridResolution},
    };
}
