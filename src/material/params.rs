//! Live-tunable material and lighting parameters
//!
//! [`MaterialParams`] is the single source of truth for everything the debug
//! panel edits. It is an ordinary value owned by the application and handed
//! by reference to [`apply_materials`](super::apply_materials).

use crate::config::MaterialDefaults;

use super::color::Color;

/// Slider granularity for every `0..=1` parameter
pub const PARAM_STEP: f32 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialParams {
    pub bike_color: Color,
    pub bike_metalness: f32,
    pub bike_roughness: f32,
    pub toggle_env_light: bool,
    pub env_map_intensity: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self::from(&MaterialDefaults::default())
    }
}

impl From<&MaterialDefaults> for MaterialParams {
    fn from(defaults: &MaterialDefaults) -> Self {
        Self {
            bike_color: defaults.bike_color,
            bike_metalness: quantize_unit(defaults.bike_metalness),
            bike_roughness: quantize_unit(defaults.bike_roughness),
            toggle_env_light: defaults.toggle_env_light,
            env_map_intensity: quantize_unit(defaults.env_map_intensity),
        }
    }
}

impl MaterialParams {
    pub fn set_bike_metalness(&mut self, value: f32) {
        self.bike_metalness = quantize_unit(value);
    }

    pub fn set_bike_roughness(&mut self, value: f32) {
        self.bike_roughness = quantize_unit(value);
    }

    pub fn set_env_map_intensity(&mut self, value: f32) {
        self.env_map_intensity = quantize_unit(value);
    }
}

/// Clamps to `0..=1` and snaps to [`PARAM_STEP`]
pub fn quantize_unit(value: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let steps = (value.clamp(0.0, 1.0) / PARAM_STEP).round();
    (steps * PARAM_STEP).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = MaterialParams::default();
        assert_eq!(params.bike_color.to_hex(), "#ff0000");
        assert!((params.bike_metalness - 0.5).abs() < 1e-6);
        assert!((params.bike_roughness - 0.5).abs() < 1e-6);
        assert!(params.toggle_env_light);
        assert!((params.env_map_intensity - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_setters_clamp_and_snap() {
        let mut params = MaterialParams::default();
        params.set_bike_metalness(1.7);
        assert_eq!(params.bike_metalness, 1.0);
        params.set_bike_roughness(-0.2);
        assert_eq!(params.bike_roughness, 0.0);
        params.set_env_map_intensity(0.456);
        assert!((params.env_map_intensity - 0.46).abs() < 1e-6);
    }

    #[test]
    fn test_quantize_rejects_nan() {
        assert_eq!(quantize_unit(f32::NAN), 0.0);
    }
}
