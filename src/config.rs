use std::f32::consts::PI;
use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{BackdropError, Result};

/// Number of decorative objects in every scene.
pub const POPULATION_SIZE: usize = 15;

/// Tunables for the backdrop. Every default matches the shipped look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BackdropConfig {
    pub population: PopulationConfig,
    pub animation: AnimationConfig,
    pub camera: CameraConfig,
    pub material: MaterialConfig,
}

impl BackdropConfig {
    /// Parses a JSON document; missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| BackdropError::Config(format!("malformed JSON: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| {
            BackdropError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.population;
        check_range("population.scale", p.scale)?;
        check_range("population.float_speed", p.float_speed)?;
        check_positive("population.half_extent_x", p.half_extent_x)?;
        check_positive("population.half_extent_y", p.half_extent_y)?;
        check_positive("population.depth_half_extent", p.depth_half_extent)?;
        check_positive("population.rotation_speed_limit", p.rotation_speed_limit)?;

        let c = &self.camera;
        check_positive("camera.fov_degrees", c.fov_degrees)?;
        check_positive("camera.near", c.near)?;
        if !(c.far.is_finite() && c.far > c.near) {
            return Err(BackdropError::Config(format!(
                "camera.far ({}) must exceed camera.near ({})",
                c.far, c.near
            )));
        }
        if !(c.smoothing > 0.0 && c.smoothing <= 1.0) {
            return Err(BackdropError::Config(format!(
                "camera.smoothing must be in (0, 1], got {}",
                c.smoothing
            )));
        }
        if !(0.0..=1.0).contains(&self.material.opacity) {
            return Err(BackdropError::Config(format!(
                "material.opacity must be in [0, 1], got {}",
                self.material.opacity
            )));
        }
        Ok(())
    }
}

/// Placement and motion ranges sampled by the populator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub half_extent_x: f32,
    pub half_extent_y: f32,
    pub depth_center: f32,
    pub depth_half_extent: f32,
    pub scale: (f32, f32),
    /// Per-axis angular rate bound, radians per frame.
    pub rotation_speed_limit: f32,
    /// Radians per millisecond.
    pub float_speed: (f32, f32),
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            half_extent_x: 10.0,
            half_extent_y: 10.0,
            depth_center: -5.0,
            depth_half_extent: 5.0,
            scale: (0.5, 1.0),
            rotation_speed_limit: 0.005,
            float_speed: (0.001, 0.003),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub float_amplitude: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            float_amplitude: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub initial_position: Vec3,
    /// Scale from normalized pointer to camera target offset.
    pub parallax: f32,
    /// Fraction of the remaining distance covered per frame.
    pub smoothing: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            initial_position: Vec3::new(0.0, 0.0, 5.0),
            parallax: 0.5,
            smoothing: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// sRGB components in [0, 1].
    pub color: Vec3,
    pub opacity: f32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            color: Vec3::new(99.0 / 255.0, 102.0 / 255.0, 241.0 / 255.0),
            opacity: 0.3,
        }
    }
}

/// Upper bound of the per-axis initial rotation.
pub(crate) const MAX_INITIAL_ROTATION: f32 = PI;

fn check_range(name: &str, (low, high): (f32, f32)) -> Result<()> {
    if low.is_finite() && high.is_finite() && low > 0.0 && low < high {
        Ok(())
    } else {
        Err(BackdropError::Config(format!(
            "{name} must be an increasing positive range, got ({low}, {high})"
        )))
    }
}

fn check_positive(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(BackdropError::Config(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_constants() {
        let config = BackdropConfig::default();
        assert_eq!(config.population.scale, (0.5, 1.0));
        assert_eq!(config.population.float_speed, (0.001, 0.003));
        assert_eq!(config.population.rotation_speed_limit, 0.005);
        assert_eq!(config.animation.float_amplitude, 0.5);
        assert_eq!(config.camera.fov_degrees, 75.0);
        assert_eq!(config.camera.initial_position, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(config.camera.smoothing, 0.05);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            BackdropConfig::from_json(r#"{ "material": { "opacity": 0.6 } }"#).unwrap();
        assert_eq!(config.material.opacity, 0.6);
        assert_eq!(config.material.color, MaterialConfig::default().color);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn rejects_inverted_ranges() {
        let err = BackdropConfig::from_json(r#"{ "population": { "scale": [1.0, 0.5] } }"#)
            .unwrap_err();
        assert!(matches!(err, BackdropError::Config(_)));
    }

    #[test]
    fn rejects_smoothing_outside_unit_interval() {
        let mut config = BackdropConfig::default();
        config.camera.smoothing = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_nan_far_plane() {
        let mut config = BackdropConfig::default();
        config.camera.far = f32::NAN;
        assert!(matches!(config.validate(), Err(BackdropError::Config(_))));
        config.camera.far = 0.05;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_ranges() {
        let mut config = BackdropConfig::default();
        config.population.scale = (-1.0, 0.5);
        assert!(config.validate().is_err());

        let mut config = BackdropConfig::default();
        config.population.float_speed = (0.0, 0.003);
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            BackdropConfig::from_json("{"),
            Err(BackdropError::Config(_))
        ));
    }
}
