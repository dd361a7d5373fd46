//! Engine configuration layered over the backend's reported [`Features`].
//!
//! Some fallbacks only run on hardware lacking a capability. To exercise them anywhere, the
//! capability can be masked off from the environment:
//! - `AERO_GLES_FORCE_STENCIL_EXPORT_FALLBACK=1` takes the compute/buffer-copy stencil blit and
//!   the per-bit stencil unresolve even when shader stencil export is available.
//! - `AERO_GLES_LIMIT_MIPMAP_LEVELS=1` restricts compute mipmap generation to 4 levels per
//!   dispatch, as on devices with few per-stage storage images.

use aero_gles_texture::caps::env_var_truthy;

use crate::hal::Features;

pub const FORCE_STENCIL_EXPORT_FALLBACK_ENV: &str = "AERO_GLES_FORCE_STENCIL_EXPORT_FALLBACK";
pub const LIMIT_MIPMAP_LEVELS_ENV: &str = "AERO_GLES_LIMIT_MIPMAP_LEVELS";

/// Storage images one compute mipmap dispatch writes.
pub const GENERATE_MIPMAP_MAX_LEVELS: u32 = 6;
/// Levels per dispatch when storage images per stage are limited.
pub const GENERATE_MIPMAP_LIMITED_LEVELS: u32 = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UtilsConfig {
    pub force_stencil_export_fallback: bool,
    pub limit_mipmap_levels: bool,
    /// Generate mipmaps with per-level draws instead of the compute shader.
    pub prefer_draw_mipmap_generation: bool,
}

impl UtilsConfig {
    pub fn from_env() -> Self {
        Self {
            force_stencil_export_fallback: env_var_truthy(FORCE_STENCIL_EXPORT_FALLBACK_ENV),
            limit_mipmap_levels: env_var_truthy(LIMIT_MIPMAP_LEVELS_ENV),
            prefer_draw_mipmap_generation: false,
        }
    }

    /// Features the engine actually uses on a device reporting `features`.
    pub fn apply(&self, mut features: Features) -> Features {
        if self.force_stencil_export_fallback {
            features.supports_shader_stencil_export = false;
        }
        if self.limit_mipmap_levels {
            features.max_per_stage_storage_images = features
                .max_per_stage_storage_images
                .min(GENERATE_MIPMAP_LIMITED_LEVELS);
        }
        features
    }

    /// Levels written per compute mipmap dispatch.
    pub fn generate_mipmap_levels(&self, features: &Features) -> u32 {
        if self.limit_mipmap_levels
            || features.max_per_stage_storage_images < GENERATE_MIPMAP_MAX_LEVELS
        {
            GENERATE_MIPMAP_LIMITED_LEVELS
        } else {
            GENERATE_MIPMAP_MAX_LEVELS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_masks_stencil_export() {
        let features = Features {
            supports_shader_stencil_export: true,
            ..Features::default()
        };
        assert!(UtilsConfig::default().apply(features).supports_shader_stencil_export);

        let config = UtilsConfig {
            force_stencil_export_fallback: true,
            ..UtilsConfig::default()
        };
        assert!(!config.apply(features).supports_shader_stencil_export);
    }

    #[test]
    fn mipmap_levels_follow_storage_image_limit() {
        let config = UtilsConfig::default();
        assert_eq!(config.generate_mipmap_levels(&Features::default()), 6);

        let limited = Features {
            max_per_stage_storage_images: 4,
            ..Features::default()
        };
        assert_eq!(config.generate_mipmap_levels(&limited), 4);

        let config = UtilsConfig {
            limit_mipmap_levels: true,
            ..UtilsConfig::default()
        };
        assert_eq!(config.generate_mipmap_levels(&Features::default()), 4);
        assert_eq!(config.apply(Features::default()).max_per_stage_storage_images, 4);
    }
}
