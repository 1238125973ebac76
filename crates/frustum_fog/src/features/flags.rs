//! Feature flag bitmask and the kernel variant it selects

use bitflags::bitflags;

use crate::gpu::names;

bitflags! {
    /// Features enabled for the current frame
    ///
    /// Bit positions are stable: they form the [`KernelVariant`] identifier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FeatureFlags: u32 {
        /// Density volumes contribute
        const VOLUMES = 1 << 0;
        /// Volumes sample the composed 3D mask atlas
        const VOLUMES_TEXTURE_MASK = 1 << 1;
        /// Volumes evaluate procedural noise masks
        const VOLUMES_NOISE_MASK = 1 << 2;
        /// Directional lights contribute
        const DIRECTIONAL_LIGHTS = 1 << 3;
        /// Directional lights sample shadow maps
        const DIRECTIONAL_SHADOWS = 1 << 4;
        /// Directional shadows use one cascade
        const DIRECTIONAL_SHADOWS_ONE_CASCADE = 1 << 5;
        /// Directional shadows use two cascades
        const DIRECTIONAL_SHADOWS_TWO_CASCADES = 1 << 6;
        /// Directional shadows use four cascades
        const DIRECTIONAL_SHADOWS_FOUR_CASCADES = 1 << 7;
        /// Directional lights sample cookie maps
        const DIRECTIONAL_COOKIES = 1 << 8;
        /// Spot lights contribute
        const SPOT_LIGHTS = 1 << 9;
        /// Spot lights sample shadow maps
        const SPOT_SHADOWS = 1 << 10;
        /// Spot lights sample cookie maps
        const SPOT_COOKIES = 1 << 11;
        /// Point lights contribute
        const POINT_LIGHTS = 1 << 12;
        /// Point lights sample shadow maps
        const POINT_SHADOWS = 1 << 13;
        /// Point lights sample cookie maps
        const POINT_COOKIES = 1 << 14;
        /// Cells behind opaque geometry are skipped
        const OCCLUSION = 1 << 15;
        /// Results are blended with the previous frame
        const REPROJECTION = 1 << 16;
    }
}

impl FeatureFlags {
    /// Any of the three cascade variant bits
    pub const CASCADE_VARIANTS: Self = Self::DIRECTIONAL_SHADOWS_ONE_CASCADE
        .union(Self::DIRECTIONAL_SHADOWS_TWO_CASCADES)
        .union(Self::DIRECTIONAL_SHADOWS_FOUR_CASCADES);

    /// Identifier of the compiled main-kernel variant for this combination
    pub const fn kernel_variant(self) -> KernelVariant {
        KernelVariant(self.bits())
    }
}

/// Stable identifier selecting a compiled kernel entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KernelVariant(pub u32);

impl KernelVariant {
    /// Variant with no optional feature
    pub const BASE: Self = Self(0);

    /// Flags this variant was built from
    pub const fn flags(self) -> FeatureFlags {
        FeatureFlags::from_bits_truncate(self.0)
    }

    /// Entry point name, `prefix` followed by every enabled flag
    pub fn entry_point_name(self, prefix: &str) -> String {
        let mut name = prefix.to_string();
        for (flag, _) in self.flags().iter_names() {
            name.push('_');
            name.push_str(flag);
        }
        name
    }

    /// Bindings the enabled features add to the main kernel contract
    pub fn required_bindings(self) -> Vec<&'static str> {
        const GATED: [(FeatureFlags, &[&str]); 13] = [
            (FeatureFlags::VOLUMES, &[names::VOLUMES_BUFFER, names::VOLUMES_COUNT]),
            (FeatureFlags::VOLUMES_TEXTURE_MASK, &[names::VOLUME_MASKS]),
            (FeatureFlags::DIRECTIONAL_LIGHTS, &[names::DIRECTIONAL_LIGHTS_BUFFER, names::DIRECTIONAL_LIGHTS_COUNT]),
            (FeatureFlags::DIRECTIONAL_SHADOWS, &[names::DIRECTIONAL_SHADOW_MAPS, names::DIRECTIONAL_SHADOW_DATA]),
            (FeatureFlags::DIRECTIONAL_COOKIES, &[names::DIRECTIONAL_COOKIE_MAPS]),
            (FeatureFlags::SPOT_LIGHTS, &[names::SPOT_LIGHTS_BUFFER, names::SPOT_LIGHTS_COUNT]),
            (FeatureFlags::SPOT_SHADOWS, &[names::SPOT_SHADOW_MAPS]),
            (FeatureFlags::SPOT_COOKIES, &[names::SPOT_COOKIE_MAPS]),
            (FeatureFlags::POINT_LIGHTS, &[names::POINT_LIGHTS_BUFFER, names::POINT_LIGHTS_COUNT]),
            (FeatureFlags::POINT_SHADOWS, &[names::POINT_SHADOW_MAPS]),
            (FeatureFlags::POINT_COOKIES, &[names::POINT_COOKIE_MAPS]),
            (FeatureFlags::OCCLUSION, &[names::OCCLUSION_INPUT]),
            (FeatureFlags::REPROJECTION, &[names::PREVIOUS_LIGHTING_VOLUME, names::PREVIOUS_WORLD_TO_CLIP]),
        ];
        let flags = self.flags();
        GATED
            .iter()
            .filter(|(flag, _)| flags.contains(*flag))
            .flat_map(|(_, required)| required.iter().copied())
            .collect()
    }
}
