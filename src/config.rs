//! Renderer configuration loaded from TOML.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```toml
//! width = 1280
//! height = 720
//! shadow_stride = 2
//! ```

use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::camera::Camera;
use crate::colors;
use crate::error::ConfigError;
use crate::light::DirectionalLight;
use crate::math::Vec3;

/// Load/save behaviour shared by TOML-backed settings.
pub trait Config: Serialize + DeserializeOwned + Default {
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

/// Resolution, camera, light and pipeline tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub fov_degrees: f32,
    pub camera_position: [f32; 3],
    pub camera_forward: [f32; 3],
    /// Direction toward the light.
    pub light_direction: [f32; 3],
    /// Shadow grid step in pixels (>= 1).
    pub shadow_stride: u32,
    /// Recompute the shadow/reflection caches every N frames (>= 1).
    pub recompute_interval: u32,
    pub blur_radius: u32,
    pub workers: usize,
    pub queue_capacity: usize,
    /// Rows per rasterization band when running on the pool.
    pub band_rows: usize,
    pub use_pool: bool,
    pub temporal_jitter: bool,
    pub clear_color: u32,
    pub sky_color: u32,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            fov_degrees: 30.0,
            camera_position: [0.0, 2.0, -7.0],
            camera_forward: [0.0, -0.15, 1.0],
            light_direction: [0.5, 0.7, -0.5],
            shadow_stride: 4,
            recompute_interval: 4,
            blur_radius: 5,
            workers: default_workers(),
            queue_capacity: 1024,
            band_rows: 16,
            use_pool: true,
            temporal_jitter: true,
            clear_color: colors::BACKGROUND,
            sky_color: colors::SKY,
        }
    }
}

impl Config for RenderConfig {}

impl RenderConfig {
    /// Loads and validates a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no renderer can be built from.
    ///
    /// Stride and recompute interval are not rejected here: zero is clamped
    /// to one by the shadow stage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid {
                field: "width/height",
                reason: format!("{}x{} has no pixels", self.width, self.height),
            });
        }
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid {
                field: "fov_degrees",
                reason: format!("{} is outside (0, 180)", self.fov_degrees),
            });
        }
        if self.use_pool && (self.workers == 0 || self.queue_capacity == 0) {
            return Err(ConfigError::Invalid {
                field: "workers/queue_capacity",
                reason: "the worker pool needs at least one worker and one queue slot".into(),
            });
        }
        Ok(())
    }

    pub fn camera(&self) -> Camera {
        Camera::new(
            Vec3::from(self.camera_position),
            Vec3::from(self.camera_forward),
            self.fov_degrees,
        )
    }

    pub fn light(&self) -> DirectionalLight {
        DirectionalLight::new(Vec3::from(self.light_direction))
    }
}
