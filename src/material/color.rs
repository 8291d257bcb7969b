//! RGB colour type used by materials, the parameter store and configuration
//!
//! Colours are stored as sRGB components in `0.0..=1.0`, the space the debug
//! panel edits and hex strings describe. Shaders receive linear values via
//! [`Color::to_linear`].

use std::{fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("colour '{0}' must look like #rrggbb")]
    InvalidLength(String),

    #[error("colour '{0}' contains a non-hex digit")]
    InvalidDigit(String),
}

/// sRGB colour with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(ColorParseError::InvalidLength(hex.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(|value| value as f32 / 255.0)
                .map_err(|_| ColorParseError::InvalidDigit(hex.to_string()))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Formats as lowercase `#rrggbb`
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    pub fn to_rgb8(&self) -> [u8; 3] {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [quantize(self.r), quantize(self.g), quantize(self.b)]
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_array(rgb: [f32; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }

    /// Converts linear components (as stored in glTF factors) to sRGB
    pub fn from_linear(rgb: [f32; 3]) -> Self {
        Self::new(
            linear_to_srgb(rgb[0]),
            linear_to_srgb(rgb[1]),
            linear_to_srgb(rgb[2]),
        )
    }

    /// Linear components for shading
    pub fn to_linear(self) -> [f32; 3] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        let green = Color::from_hex("#00ff00").unwrap();
        assert_eq!(green, Color::new(0.0, 1.0, 0.0));
        assert_eq!("ff0000".parse::<Color>().unwrap(), Color::new(1.0, 0.0, 0.0));
        assert_eq!(green.to_hex(), "#00ff00");
    }

    #[test]
    fn test_invalid_hex() {
        assert!(matches!(
            Color::from_hex("#fff"),
            Err(ColorParseError::InvalidLength(_))
        ));
        assert!(matches!(
            Color::from_hex("#gg0000"),
            Err(ColorParseError::InvalidDigit(_))
        ));
    }

    #[test]
    fn test_linear_round_trip_keeps_hex() {
        let grey = Color::from_hex("#c2c2c2").unwrap();
        let back = Color::from_linear(grey.to_linear());
        assert_eq!(back.to_hex(), "#c2c2c2");
    }
}
