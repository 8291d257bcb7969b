//! Viewer configuration and asset manifest
//!
//! Every setting has a built-in default matching the stock showroom scene.
//! A TOML file can override any subset of keys:
//!
//! ```toml
//! [assets]
//! model = "models/scooter.glb"
//! subject_marker = "Body"
//!
//! [material]
//! bike_color = "#00ff00"
//!
//! [debug]
//! light_helper = true
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::material::Color;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Complete viewer configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub assets: AssetManifest,
    pub scene: SceneConfig,
    pub camera: CameraConfig,
    pub light: SpotLightConfig,
    pub material: MaterialDefaults,
    pub controls: ControlsConfig,
    pub output: OutputConfig,
    pub debug: DebugConfig,
}

impl ViewerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

/// Which files make up the asset bundle and how surfaces are tagged
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetManifest {
    pub environment_map: PathBuf,
    pub model: PathBuf,
    /// Surfaces whose name contains this marker are tagged as the subject
    pub subject_marker: String,
    /// Remote mesh-compression decoder location (logged when a model needs it)
    pub draco_decoder_path: String,
    /// Environment maps wider than this are downsampled before upload
    pub max_environment_width: u32,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            environment_map: PathBuf::from("./envmaps/parking_garage_4k.hdr"),
            model: PathBuf::from("honda_cb_750_f_super_sport_1970.glb"),
            subject_marker: "Object_6".to_string(),
            draco_decoder_path: "https://www.gstatic.com/draco/versioned/decoders/1.5.7/"
                .to_string(),
            max_environment_width: 2048,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub model_scale: f32,
    pub ground_size: f32,
    pub ground_color: Color,
    pub clear_color: Color,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            model_scale: 3.5,
            ground_size: 100.0,
            ground_color: Color::new(194.0 / 255.0, 194.0 / 255.0, 194.0 / 255.0),
            clear_color: Color::BLACK,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [3.5, 2.8, 5.0],
            target: [0.0, 0.0, 0.0],
            fov_degrees: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpotLightConfig {
    pub position: [f32; 3],
    pub color: Color,
    pub intensity: f32,
    /// Cone half-angle in radians
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
    pub cast_shadow: bool,
    /// Radius of the horizontal circle the light orbits on
    pub orbit_radius: f32,
    pub shadow_map_size: u32,
}

impl Default for SpotLightConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 10.0, 0.0],
            color: Color::WHITE,
            intensity: 10.0,
            angle: std::f32::consts::FRAC_PI_3,
            penumbra: 0.0,
            decay: 2.0,
            cast_shadow: true,
            orbit_radius: 1.5,
            shadow_map_size: 2048,
        }
    }
}

/// Startup values for the live material parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaterialDefaults {
    pub bike_color: Color,
    pub bike_metalness: f32,
    pub bike_roughness: f32,
    pub toggle_env_light: bool,
    pub env_map_intensity: f32,
}

impl Default for MaterialDefaults {
    fn default() -> Self {
        Self {
            bike_color: Color::new(1.0, 0.0, 0.0),
            bike_metalness: 0.5,
            bike_roughness: 0.5,
            toggle_env_light: true,
            env_map_intensity: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub auto_rotate: bool,
    /// Revolutions are `60 / speed` seconds long
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            auto_rotate: true,
            auto_rotate_speed: 2.0,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            pan_speed: 0.01,
            min_distance: 1.0,
            max_distance: 50.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub screenshot_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            screenshot_name: "bike-image.png".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn screenshot_path(&self) -> PathBuf {
        self.directory.join(&self.screenshot_name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Draw the spotlight cone wireframe
    pub light_helper: bool,
    /// Draw the environment map behind the scene instead of the clear colour
    pub environment_background: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!(config.assets.subject_marker, "Object_6");
        assert_eq!(config.scene.model_scale, 3.5);
        assert_eq!(config.camera.position, [3.5, 2.8, 5.0]);
        assert_eq!(config.output.screenshot_path(), PathBuf::from("./bike-image.png"));
        assert!(!config.debug.light_helper);
    }

    #[test]
    fn test_partial_override() {
        let config = ViewerConfig::from_toml_str(
            r##"
            [assets]
            model = "scooter.glb"

            [material]
            bike_color = "#00ff00"
            toggle_env_light = false

            [debug]
            environment_background = true
            "##,
        )
        .unwrap();

        assert_eq!(config.assets.model, PathBuf::from("scooter.glb"));
        assert_eq!(
            config.assets.environment_map,
            PathBuf::from("./envmaps/parking_garage_4k.hdr")
        );
        assert_eq!(config.material.bike_color, Color::new(0.0, 1.0, 0.0));
        assert!(!config.material.toggle_env_light);
        assert_eq!(config.material.bike_metalness, 0.5);
        assert!(config.debug.environment_background);
    }

    #[test]
    fn test_bad_colour_is_a_parse_error() {
        let result = ViewerConfig::from_toml_str(
            r##"
            [scene]
            ground_color = "grey"
            "##,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
