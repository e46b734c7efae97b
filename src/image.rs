use crate::id::ImageId;
use std::sync::Arc;

/// Decoded RGBA8 pixels with a stable identity.
///
/// Clones share the identity, so caches keyed by image (textures, image lights) treat them as the
/// same source.
#[derive(Debug, Clone)]
pub struct Image {
    id: ImageId,
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl Image {
    /// Wraps tightly packed RGBA8 rows. Missing bytes are padded with transparent black.
    pub fn from_rgba8(width: u32, height: u32, mut pixels: Vec<u8>) -> Self {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            tracing::warn!(
                width,
                height,
                len = pixels.len(),
                "image data does not match its dimensions"
            );
            pixels.resize(expected, 0);
        }
        Self {
            id: ImageId::next(),
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// A single-color image.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::from_rgba8(width, height, pixels)
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut out = [0; 4];
        out.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(out)
    }

    /// Pixels resampled (nearest neighbour) so neither side exceeds `max_side`.
    pub(crate) fn fit_within(&self, max_side: u32) -> (u32, u32, Vec<u8>) {
        let longest = self.width.max(self.height);
        if longest <= max_side {
            return (self.width, self.height, self.pixels.to_vec());
        }
        let scale = max_side as f32 / longest as f32;
        let width = ((self.width as f32 * scale) as u32).max(1);
        let height = ((self.height as f32 * scale) as u32).max(1);
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            let source_y = ((y as f32 / scale) as u32).min(self.height - 1);
            for x in 0..width {
                let source_x = ((x as f32 / scale) as u32).min(self.width - 1);
                let offset = (source_y as usize * self.width as usize + source_x as usize) * 4;
                pixels.extend_from_slice(&self.pixels[offset..offset + 4]);
            }
        }
        (width, height, pixels)
    }
}
