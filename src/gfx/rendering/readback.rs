//! Copies a rendered texture back to CPU memory

use std::sync::mpsc;

use crate::screenshot::{CapturedFrame, ScreenshotError};

/// Row pitch of a texture-to-buffer copy, padded to wgpu's alignment
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (width * bytes_per_pixel).div_ceil(align) * align
}

/// Drops the per-row padding a texture copy introduces
pub fn strip_row_padding(data: &[u8], height: u32, unpadded: u32, padded: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((unpadded * height) as usize);
    for row in data.chunks(padded as usize).take(height as usize) {
        pixels.extend_from_slice(&row[..unpadded as usize]);
    }
    pixels
}

/// A texture copy recorded into an encoder, waiting for submission
pub struct PendingReadback {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
    format: wgpu::TextureFormat,
}

impl PendingReadback {
    /// Records a copy of `texture` into a fresh staging buffer
    ///
    /// Only 4-byte colour formats are supported.
    pub fn encode(
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        texture: &wgpu::Texture,
    ) -> Self {
        let width = texture.width();
        let height = texture.height();
        let padded_bytes_per_row = padded_bytes_per_row(width, 4);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Screenshot Staging Buffer"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        Self {
            buffer,
            width,
            height,
            padded_bytes_per_row,
            format: texture.format(),
        }
    }

    /// Blocks until the copy has landed and returns the packed pixels
    ///
    /// Must be called after the encoder holding the copy was submitted.
    pub fn wait(self, device: &wgpu::Device) -> Result<CapturedFrame, ScreenshotError> {
        let slice = self.buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::PollType::Wait)?;
        receiver
            .recv()
            .map_err(|_| ScreenshotError::MapCallbackDropped)??;

        let pixels = {
            let data = slice.get_mapped_range();
            strip_row_padding(&data, self.height, self.width * 4, self.padded_bytes_per_row)
        };
        self.buffer.unmap();

        Ok(CapturedFrame {
            width: self.width,
            height: self.height,
            format: self.format,
            pixels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_padded_to_alignment() {
        assert_eq!(padded_bytes_per_row(64, 4), 256);
        assert_eq!(padded_bytes_per_row(65, 4), 512);
        assert_eq!(padded_bytes_per_row(800, 4), 3328);
    }

    #[test]
    fn test_strip_row_padding() {
        // two rows of 3 payload bytes, padded to 5
        let data = [1, 2, 3, 0, 0, 4, 5, 6, 0, 0];
        assert_eq!(strip_row_padding(&data, 2, 3, 5), vec![1, 2, 3, 4, 5, 6]);
    }
}
