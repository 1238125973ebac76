//! Feature flags and kernel variant selection
//!
//! Once per frame the category managers report what data is available, the
//! resolver combines it with the user toggles, and the resulting
//! [`FeatureFlags`] select both the compiled entry point and the resources
//! bound to it.

mod flags;
mod resolver;

pub use flags::{FeatureFlags, KernelVariant};
pub use resolver::{
    resolve, CategoryState, FeatureFlagResolver, FeatureToggles, RuntimeState, ShadowCascades, VolumeState,
};
