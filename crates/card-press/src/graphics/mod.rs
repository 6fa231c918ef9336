//! Millimeter-aware raster images
//!
//! Card artwork is handled as a plain pixel buffer plus an explicit physical
//! resolution per axis. Physical width/height in mm are always derived from
//! the resolution, so "resizing" to a physical size changes the resolution
//! and never the pixel count.

mod bleed;
mod transform;

pub use transform::{AspectRotation, ImageTransform};

use std::io::Cursor;
use std::path::Path;

use image::{imageops, Rgba, RgbaImage};

use crate::types::{CardPressError, Result};

/// Resolution assigned to freshly decoded files (96 dpi); decoders in the
/// `image` crate do not surface density metadata.
pub const DEFAULT_DOTS_PER_MM: f64 = 96.0 / 25.4;

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// A pixel buffer with per-axis physical resolution (dots per mm).
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalImage {
    pixels: RgbaImage,
    dots_per_mm_x: f64,
    dots_per_mm_y: f64,
}

impl PhysicalImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            dots_per_mm_x: DEFAULT_DOTS_PER_MM,
            dots_per_mm_y: DEFAULT_DOTS_PER_MM,
        }
    }

    /// Decode an image file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|e| CardPressError::ImageLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(decoded.to_rgba8()))
    }

    pub fn width_px(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height_px(&self) -> u32 {
        self.pixels.height()
    }

    pub fn width_mm(&self) -> f64 {
        f64::from(self.pixels.width()) / self.dots_per_mm_x
    }

    pub fn height_mm(&self) -> f64 {
        f64::from(self.pixels.height()) / self.dots_per_mm_y
    }

    /// Set physical width by adjusting the horizontal resolution. The pixel
    /// count is untouched.
    pub fn set_width_mm(&mut self, width_mm: f64) -> Result<()> {
        if width_mm <= 0.0 {
            return Err(CardPressError::InvalidArgument(
                "physical width must be positive".to_string(),
            ));
        }
        self.dots_per_mm_x = f64::from(self.pixels.width()) / width_mm;
        Ok(())
    }

    /// Set physical height by adjusting the vertical resolution
    pub fn set_height_mm(&mut self, height_mm: f64) -> Result<()> {
        if height_mm <= 0.0 {
            return Err(CardPressError::InvalidArgument(
                "physical height must be positive".to_string(),
            ));
        }
        self.dots_per_mm_y = f64::from(self.pixels.height()) / height_mm;
        Ok(())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.pixels.get_pixel(x, y)
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Resample to an exact pixel size. Resolution metadata is carried over
    /// unchanged, matching the loose semantics of a plain pixel resize.
    pub fn scaled(&self, width_px: u32, height_px: u32) -> PhysicalImage {
        let pixels = imageops::resize(
            &self.pixels,
            width_px,
            height_px,
            imageops::FilterType::Lanczos3,
        );
        PhysicalImage {
            pixels,
            dots_per_mm_x: self.dots_per_mm_x,
            dots_per_mm_y: self.dots_per_mm_y,
        }
    }

    /// Quarter turn clockwise; swaps the physical resolutions along with the
    /// axes so physical dimensions rotate too.
    pub fn rotated_clockwise(&self) -> PhysicalImage {
        PhysicalImage {
            pixels: imageops::rotate90(&self.pixels),
            dots_per_mm_x: self.dots_per_mm_y,
            dots_per_mm_y: self.dots_per_mm_x,
        }
    }

    /// Quarter turn anticlockwise
    pub fn rotated_anticlockwise(&self) -> PhysicalImage {
        PhysicalImage {
            pixels: imageops::rotate270(&self.pixels),
            dots_per_mm_x: self.dots_per_mm_y,
            dots_per_mm_y: self.dots_per_mm_x,
        }
    }

    /// Half turn; axes keep their meaning
    pub fn rotated_half_circle(&self) -> PhysicalImage {
        PhysicalImage {
            pixels: imageops::rotate180(&self.pixels),
            dots_per_mm_x: self.dots_per_mm_x,
            dots_per_mm_y: self.dots_per_mm_y,
        }
    }

    /// Encode as PNG bytes
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        self.pixels.write_to(&mut bytes, image::ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }

    /// Write to a file; format inferred from the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.pixels.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn solid(w: u32, h: u32, rgba: [u8; 4]) -> PhysicalImage {
        PhysicalImage::new(RgbaImage::from_pixel(w, h, Rgba(rgba)))
    }

    #[test]
    fn physical_size_derives_from_resolution() {
        let mut img = solid(100, 200, [10, 20, 30, 255]);
        img.set_width_mm(50.0).unwrap();
        img.set_height_mm(80.0).unwrap();
        assert_eq!(img.width_px(), 100);
        assert_eq!(img.height_px(), 200);
        assert!((img.width_mm() - 50.0).abs() < 1e-9);
        assert!((img.height_mm() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn rotation_swaps_physical_axes() {
        let mut img = solid(100, 200, [1, 2, 3, 255]);
        img.set_width_mm(50.0).unwrap();
        img.set_height_mm(80.0).unwrap();
        let turned = img.rotated_clockwise();
        assert_eq!(turned.width_px(), 200);
        assert_eq!(turned.height_px(), 100);
        assert!((turned.width_mm() - 80.0).abs() < 1e-9);
        assert!((turned.height_mm() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn half_turn_is_lossless() {
        let mut img = solid(3, 2, [0, 0, 0, 255]);
        img.pixels.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let back = img.rotated_half_circle().rotated_half_circle();
        assert_eq!(img, back);
    }

    #[test]
    fn open_missing_file_is_image_load_error() {
        let err = PhysicalImage::open("/nonexistent/card.png").unwrap_err();
        assert!(matches!(err, CardPressError::ImageLoad { .. }));
    }
}
