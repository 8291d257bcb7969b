//! Framebuffer capture to PNG
//!
//! The render engine copies the presented frame into a [`CapturedFrame`];
//! this module turns it into an RGBA image on disk.

use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder};
use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenshotError {
    #[error("the surface does not support copying its frames")]
    SurfaceNotCopyable,

    #[error("cannot capture frames in {0:?}")]
    UnsupportedFormat(wgpu::TextureFormat),

    #[error("failed to map the readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),

    #[error("the readback callback was dropped before completing")]
    MapCallbackDropped,

    #[error("waiting for the GPU failed: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error("frame holds {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Tightly packed pixels of one presented frame
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub pixels: Vec<u8>,
}

impl CapturedFrame {
    /// Converts the frame to opaque 8-bit RGBA
    pub fn to_rgba8(&self) -> Result<Vec<u8>, ScreenshotError> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.pixels.len() != expected {
            return Err(ScreenshotError::SizeMismatch {
                expected,
                actual: self.pixels.len(),
            });
        }

        let swap_red_blue = match self.format {
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => true,
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => false,
            other => return Err(ScreenshotError::UnsupportedFormat(other)),
        };

        let mut rgba = self.pixels.clone();
        for pixel in rgba.chunks_exact_mut(4) {
            if swap_red_blue {
                pixel.swap(0, 2);
            }
            pixel[3] = u8::MAX;
        }
        Ok(rgba)
    }
}

/// Writes `frame` to `path` as PNG, creating the parent directory if needed
pub fn save_png(frame: &CapturedFrame, path: &Path) -> Result<(), ScreenshotError> {
    let rgba = frame.to_rgba8()?;

    let io_error = |source| ScreenshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = File::create(path).map_err(io_error)?;

    PngEncoder::new(BufWriter::new(file)).write_image(
        &rgba,
        frame.width,
        frame.height,
        ExtendedColorType::Rgba8,
    )?;

    info!(
        "Saved {}x{} screenshot to {}",
        frame.width,
        frame.height,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(format: wgpu::TextureFormat) -> CapturedFrame {
        // 2x1: a blue-ish pixel then a red one, stored in BGRA order
        CapturedFrame {
            width: 2,
            height: 1,
            format,
            pixels: vec![255, 0, 10, 0, 0, 0, 200, 128],
        }
    }

    #[test]
    fn test_bgra_is_swizzled_and_opaque() {
        let rgba = frame(wgpu::TextureFormat::Bgra8Unorm).to_rgba8().unwrap();
        assert_eq!(rgba, vec![10, 0, 255, 255, 200, 0, 0, 255]);
    }

    #[test]
    fn test_rgba_passes_through() {
        let rgba = frame(wgpu::TextureFormat::Rgba8UnormSrgb).to_rgba8().unwrap();
        assert_eq!(rgba, vec![255, 0, 10, 255, 0, 0, 200, 255]);
    }

    #[test]
    fn test_float_surface_is_rejected() {
        let result = frame(wgpu::TextureFormat::Rgba16Float).to_rgba8();
        assert!(matches!(result, Err(ScreenshotError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let mut short = frame(wgpu::TextureFormat::Bgra8Unorm);
        short.pixels.pop();
        assert!(matches!(
            short.to_rgba8(),
            Err(ScreenshotError::SizeMismatch { expected: 8, actual: 7 })
        ));
    }

    #[test]
    fn test_save_png_round_trips_through_image() {
        let dir = std::env::temp_dir().join(format!("showroom-shot-{}", std::process::id()));
        let path = dir.join("nested").join("bike-image.png");

        save_png(&frame(wgpu::TextureFormat::Bgra8Unorm), &path).unwrap();

        let decoded = image::open(&path).unwrap().into_rgba8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(1, 0).0, [200, 0, 0, 255]);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
