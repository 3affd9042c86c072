use crate::error::HeightfieldError;
use crate::grid::Heightfield;
use image::{GrayImage, ImageBuffer, Luma};
use std::path::Path;

/// Largest rendered image side, in pixels.
pub const MAX_IMAGE_SIDE: u32 = 16384;

pub struct HeightfieldRenderer;

impl HeightfieldRenderer {
    /// Greyscale intensity of one elevation, normalized against the
    /// field's maximum. A zero or non-finite maximum renders black.
    pub fn intensity(value: f64, max_height: f64) -> u8 {
        if max_height == 0.0 || !max_height.is_finite() || !value.is_finite() {
            return 0;
        }
        (value / max_height * 255.0).round().clamp(0.0, 255.0) as u8
    }

    /// Pixel side of a rendered `span x span` field at `scale`, bounded
    /// by [`MAX_IMAGE_SIDE`].
    pub fn image_side(span: usize, scale: u32) -> Result<u32, HeightfieldError> {
        u32::try_from(span)
            .ok()
            .and_then(|span| span.checked_mul(scale))
            .filter(|&side| scale > 0 && side <= MAX_IMAGE_SIDE)
            .ok_or(HeightfieldError::InvalidScale(scale))
    }

    /// Renders a heightfield to a greyscale image for PNG export
    pub fn render_to_image(field: &Heightfield, scale: u32) -> Result<GrayImage, HeightfieldError> {
        let size = Self::image_side(field.span, scale)?;
        let mut img = ImageBuffer::new(size, size);

        for (x, y, height) in field.iter() {
            let brightness = Luma([Self::intensity(height, field.max_height)]);
            for ty in 0..scale {
                for tx in 0..scale {
                    img.put_pixel(x as u32 * scale + tx, y as u32 * scale + ty, brightness);
                }
            }
        }

        Ok(img)
    }

    pub fn save_png(field: &Heightfield, path: &Path, scale: u32) -> Result<(), HeightfieldError> {
        Self::render_to_image(field, scale)?.save(path)?;
        Ok(())
    }
}
