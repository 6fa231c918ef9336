//! Composable image-to-image transforms

use super::PhysicalImage;

/// An image-to-image transform applied before a card is normalized for
/// placement. One strategy exists today; the seam stays open for more.
pub trait ImageTransform {
    fn apply(&self, image: PhysicalImage) -> PhysicalImage;
}

/// Rotates an image a quarter turn when its aspect does not match the
/// target orientation; passes it through otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRotation {
    /// Target portrait aspect when true, landscape otherwise
    pub portrait: bool,
    /// Rotate clockwise when true, anticlockwise otherwise
    pub clockwise: bool,
    /// Compare physical (mm) dimensions when true, pixel counts otherwise
    pub physical: bool,
}

impl Default for AspectRotation {
    fn default() -> Self {
        Self {
            portrait: true,
            clockwise: false,
            physical: true,
        }
    }
}

impl ImageTransform for AspectRotation {
    fn apply(&self, image: PhysicalImage) -> PhysicalImage {
        let (w, h) = if self.physical {
            (image.width_mm(), image.height_mm())
        } else {
            (f64::from(image.width_px()), f64::from(image.height_px()))
        };
        let mismatch = if self.portrait { w > h } else { h > w };
        if !mismatch {
            return image;
        }
        if self.clockwise {
            image.rotated_clockwise()
        } else {
            image.rotated_anticlockwise()
        }
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    fn image(w_px: u32, h_px: u32, w_mm: f64, h_mm: f64) -> PhysicalImage {
        let mut img = PhysicalImage::new(RgbaImage::from_pixel(w_px, h_px, Rgba([9, 9, 9, 255])));
        img.set_width_mm(w_mm).unwrap();
        img.set_height_mm(h_mm).unwrap();
        img
    }

    #[test]
    fn landscape_image_rotates_to_portrait() {
        let img = image(200, 100, 88.0, 61.5);
        let out = AspectRotation::default().apply(img);
        assert_eq!((out.width_px(), out.height_px()), (100, 200));
        assert!(out.width_mm() < out.height_mm());
    }

    #[test]
    fn matching_aspect_passes_through() {
        let img = image(100, 200, 61.5, 88.0);
        let out = AspectRotation::default().apply(img.clone());
        assert_eq!(out, img);
    }

    #[test]
    fn pixel_aspect_ignores_physical_size() {
        // Physically landscape but pixel-portrait; pixel mode must not rotate.
        let img = image(100, 200, 88.0, 61.5);
        let trans = AspectRotation {
            physical: false,
            ..Default::default()
        };
        let out = trans.apply(img.clone());
        assert_eq!(out, img);
    }

    #[test]
    fn landscape_target_rotates_portrait_image() {
        let img = image(100, 200, 61.5, 88.0);
        let trans = AspectRotation {
            portrait: false,
            clockwise: true,
            physical: true,
        };
        let out = trans.apply(img);
        assert_eq!((out.width_px(), out.height_px()), (200, 100));
    }
}
