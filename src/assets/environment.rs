//! Equirectangular HDR environment maps

use std::path::Path;

use image::{imageops::FilterType, ImageReader, Rgba32FImage};
use log::debug;

use super::error::AssetError;

/// Linear RGBA float pixels laid out row-major, top row first
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentMap {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl EnvironmentMap {
    /// Panics if `pixels.len() != width * height`
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<[f32; 4]>) -> Self {
        assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Decodes an HDR (or any float-capable) image and shrinks it to at most
    /// `max_width` pixels across
    pub fn load(path: &Path, max_width: u32) -> Result<Self, AssetError> {
        let decoded = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        let image = decoded.into_rgba32f();
        debug!(
            "Decoded environment {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self::from_image(fit_width(image, max_width)))
    }

    fn from_image(image: Rgba32FImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels = image.pixels().map(|p| p.0).collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

/// Largest texture edge the renderer requests from the device
pub const MAX_TEXTURE_SIZE: u32 = 4096;

/// Shrinks `image` to `max_width` across, keeping its aspect ratio.
/// A zero width means no preference; either edge is capped at
/// [`MAX_TEXTURE_SIZE`] regardless.
fn fit_width(image: Rgba32FImage, max_width: u32) -> Rgba32FImage {
    let (width, height) = image.dimensions();
    let limit = if max_width == 0 {
        MAX_TEXTURE_SIZE
    } else {
        max_width.min(MAX_TEXTURE_SIZE)
    };

    // Whichever edge overshoots its cap by more decides the scale
    let width_dominates =
        width as u64 * MAX_TEXTURE_SIZE as u64 >= height as u64 * limit as u64;
    let (target, source) = if width_dominates {
        (limit, width)
    } else {
        (MAX_TEXTURE_SIZE, height)
    };
    if source <= target {
        return image;
    }
    let scale = |edge: u32| ((edge as u64 * target as u64) / source as u64).max(1) as u32;
    image::imageops::resize(&image, scale(width), scale(height), FilterType::Triangle)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Writes a 2x2 Radiance file where every pixel is (1, 1, 1)
    pub(crate) fn write_hdr_fixture(path: &Path) {
        let mut bytes = b"#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y 2 +X 2\n".to_vec();
        for _ in 0..4 {
            bytes.extend_from_slice(&[128, 128, 128, 129]);
        }
        std::fs::write(path, bytes).unwrap();
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("showroom-env-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_load_hdr_fixture() {
        let path = temp_path("unit.hdr");
        write_hdr_fixture(&path);

        let map = EnvironmentMap::load(&path, 2048).unwrap();
        assert_eq!((map.width(), map.height()), (2, 2));
        for pixel in map.pixels() {
            assert!((pixel[0] - 1.0).abs() < 1e-3);
            assert!((pixel[1] - 1.0).abs() < 1e-3);
            assert!((pixel[2] - 1.0).abs() < 1e-3);
        }
        assert_eq!(map.as_bytes().len(), 4 * 16);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EnvironmentMap::load(Path::new("/nonexistent/env.hdr"), 2048).unwrap_err();
        assert!(matches!(err, AssetError::Io(_)));
    }

    #[test]
    fn test_wide_maps_are_downsampled() {
        let image = Rgba32FImage::from_pixel(8, 4, image::Rgba([0.5, 0.5, 0.5, 1.0]));
        let fitted = fit_width(image, 4);
        assert_eq!(fitted.dimensions(), (4, 2));
    }

    #[test]
    fn test_unlimited_width_is_capped_at_texture_size() {
        let image = Rgba32FImage::new(MAX_TEXTURE_SIZE * 2, 8);
        assert_eq!(fit_width(image, 0).dimensions(), (MAX_TEXTURE_SIZE, 4));
    }

    #[test]
    fn test_width_above_texture_size_is_capped() {
        let image = Rgba32FImage::new(MAX_TEXTURE_SIZE + 1000, 2);
        assert_eq!(fit_width(image, 10_000).dimensions().0, MAX_TEXTURE_SIZE);
    }

    #[test]
    fn test_tall_maps_are_capped_by_height() {
        let image = Rgba32FImage::new(2, MAX_TEXTURE_SIZE * 2);
        assert_eq!(fit_width(image, 0).dimensions(), (1, MAX_TEXTURE_SIZE));
    }

    #[test]
    fn test_small_maps_are_untouched() {
        let image = Rgba32FImage::new(16, 8);
        assert_eq!(fit_width(image, 0).dimensions(), (16, 8));
    }
}
