//! Fog settings

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::features::{FeatureToggles, ShadowCascades};
use crate::frustum::SnapPolicy;

/// Frustum grid configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Requested cell count per axis (x, y, depth)
    pub resolution: [u32; 3],
    /// Kernel thread group size per axis
    pub thread_group_size: [u32; 3],
    /// How requests are snapped to thread group multiples
    pub snap: SnapPolicy,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self { resolution: [160, 90, 128], thread_group_size: [8, 8, 8], snap: SnapPolicy::Down }
    }
}

/// Shadow map configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Directional cascade configuration
    pub cascades: ShadowCascades,
    /// Per-cascade directional shadow resolution
    pub directional_resolution: u32,
    /// Spot shadow map resolution
    pub spot_resolution: u32,
    /// Point shadow map resolution
    pub point_resolution: u32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self { cascades: ShadowCascades::Four, directional_resolution: 512, spot_resolution: 256, point_resolution: 256 }
    }
}

/// Cookie map configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    /// Directional cookie resolution
    pub directional_resolution: u32,
    /// Spot cookie resolution
    pub spot_resolution: u32,
    /// Point cookie resolution
    pub point_resolution: u32,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self { directional_resolution: 256, spot_resolution: 128, point_resolution: 128 }
    }
}

/// Everything configurable about the fog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogSettings {
    /// Frustum grid
    pub grid: GridSettings,
    /// Far range of the grid, also the culling cutoff distance
    pub far_distance: f32,
    /// User feature toggles
    pub features: FeatureToggles,
    /// Shadow maps
    pub shadows: ShadowSettings,
    /// Cookie maps
    pub cookies: CookieSettings,
    /// Cubic size of volume mask textures
    pub volume_mask_size: u32,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            grid: GridSettings::default(),
            far_distance: 64.0,
            features: FeatureToggles::default(),
            shadows: ShadowSettings::default(),
            cookies: CookieSettings::default(),
            volume_mask_size: 32,
        }
    }
}

impl Config for FogSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.thread_group_size.contains(&0) {
            return Err(ConfigError::Invalid(format!(
                "thread group size {:?} has an empty axis",
                self.grid.thread_group_size
            )));
        }
        if !self.far_distance.is_finite() || self.far_distance <= 0.0 {
            return Err(ConfigError::Invalid(format!("far distance must be positive, got {}", self.far_distance)));
        }
        let resolutions = [
            ("shadows.directional_resolution", self.shadows.directional_resolution),
            ("shadows.spot_resolution", self.shadows.spot_resolution),
            ("shadows.point_resolution", self.shadows.point_resolution),
            ("cookies.directional_resolution", self.cookies.directional_resolution),
            ("cookies.spot_resolution", self.cookies.spot_resolution),
            ("cookies.point_resolution", self.cookies.point_resolution),
            ("volume_mask_size", self.volume_mask_size),
        ];
        if let Some((name, _)) = resolutions.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{} must be non-zero", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        assert!(FogSettings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let text = r#"
            far_distance = 32.5

            [grid]
            resolution = [64, 32, 48]

            [shadows]
            cascades = "Two"

            [features]
            occlusion_culling = false
        "#;
        let settings = FogSettings::parse(text, ConfigFormat::Toml).unwrap();
        assert_relative_eq!(settings.far_distance, 32.5);
        assert_eq!(settings.grid.resolution, [64, 32, 48]);
        assert_eq!(settings.grid.thread_group_size, [8, 8, 8]);
        assert_eq!(settings.shadows.cascades, ShadowCascades::Two);
        assert_eq!(settings.shadows.directional_resolution, 512);
        assert!(!settings.features.occlusion_culling);
        assert!(settings.features.temporal_reprojection);
    }

    #[test]
    fn test_ron_round_trip() {
        let mut settings = FogSettings::default();
        settings.grid.snap = SnapPolicy::Nearest;
        settings.volume_mask_size = 16;
        let text = settings.to_config_string(ConfigFormat::Ron).unwrap();
        assert_eq!(FogSettings::parse(&text, ConfigFormat::Ron).unwrap(), settings);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = FogSettings::default();
        settings.grid.thread_group_size = [8, 0, 8];
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));

        let settings = FogSettings { far_distance: f32::NAN, ..FogSettings::default() };
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));

        let mut settings = FogSettings::default();
        settings.cookies.spot_resolution = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(message)) if message.contains("cookies.spot")));
    }

    #[test]
    fn test_invalid_file_contents_are_rejected_on_parse() {
        let text = "far_distance = -1.0";
        assert!(matches!(FogSettings::parse(text, ConfigFormat::Toml), Err(ConfigError::Invalid(_))));
        assert!(matches!(FogSettings::parse("far_distance = [", ConfigFormat::Toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_file_round_trip_and_unsupported_extension() {
        let dir = std::env::temp_dir().join(format!("frustum_fog_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fog.toml");

        let settings = FogSettings { far_distance: 100.0, ..FogSettings::default() };
        settings.save_to_file(&path).unwrap();
        assert_eq!(FogSettings::load_from_file(&path).unwrap(), settings);

        assert!(matches!(settings.save_to_file(dir.join("fog.json")), Err(ConfigError::UnsupportedFormat(_))));
        assert!(matches!(FogSettings::load_from_file(dir.join("missing.ron")), Err(ConfigError::Io(_))));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
