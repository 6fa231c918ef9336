//! Bleed add/crop by border pixel replication
//!
//! The pixel delta added per side is a fraction of the *final* physical size,
//! `bleed / (size + 2*bleed)`, so a later crop computed from the enlarged
//! image lands back on the original dimensions without fractional-pixel
//! drift.

use image::RgbaImage;

use crate::types::{CardPressError, Result};

use super::PhysicalImage;

impl PhysicalImage {
    /// Extend the image by `bleed_mm` on every side.
    ///
    /// Side strips replicate the outermost row/column; corners are filled
    /// with the color of the nearest original corner pixel. The result's
    /// physical size grows by `2 * bleed_mm` per axis.
    pub fn add_bleed(&self, bleed_mm: f64) -> Result<PhysicalImage> {
        if bleed_mm < 0.0 {
            return Err(CardPressError::InvalidArgument(
                "bleed must be non-negative".to_string(),
            ));
        }
        if bleed_mm == 0.0 {
            return Ok(self.clone());
        }

        let (w, h) = (self.width_px(), self.height_px());
        let (w_mm, h_mm) = (self.width_mm(), self.height_mm());
        let dx = (f64::from(w) * bleed_mm / (w_mm + 2.0 * bleed_mm)) as u32;
        let dy = (f64::from(h) * bleed_mm / (h_mm + 2.0 * bleed_mm)) as u32;

        let mut out = RgbaImage::new(w + 2 * dx, h + 2 * dy);
        image::imageops::replace(&mut out, &self.pixels, i64::from(dx), i64::from(dy));

        if dx > 0 {
            // Pad left/right with the outermost columns
            for y in 0..h {
                let left = self.pixel(0, y);
                let right = self.pixel(w - 1, y);
                for x in 0..dx {
                    out.put_pixel(x, y + dy, left);
                    out.put_pixel(w + dx + x, y + dy, right);
                }
            }
        }

        if dy > 0 {
            // Pad top/bottom with the outermost rows
            for x in 0..w {
                let top = self.pixel(x, 0);
                let bottom = self.pixel(x, h - 1);
                for y in 0..dy {
                    out.put_pixel(x + dx, y, top);
                    out.put_pixel(x + dx, h + dy + y, bottom);
                }
            }
        }

        if dx > 0 && dy > 0 {
            // Fill the corners with the nearest original corner color
            let corners = [
                (0, 0, self.pixel(0, 0)),
                (w + dx, 0, self.pixel(w - 1, 0)),
                (0, h + dy, self.pixel(0, h - 1)),
                (w + dx, h + dy, self.pixel(w - 1, h - 1)),
            ];
            for (x0, y0, color) in corners {
                for y in y0..y0 + dy {
                    for x in x0..x0 + dx {
                        out.put_pixel(x, y, color);
                    }
                }
            }
        }

        let mut result = PhysicalImage::new(out);
        result.set_width_mm(w_mm + 2.0 * bleed_mm)?;
        result.set_height_mm(h_mm + 2.0 * bleed_mm)?;
        Ok(result)
    }

    /// Trim `bleed_mm` of excess bleed from every side, returning the
    /// centered sub-rectangle. No-op when the crop rounds to zero pixels on
    /// both axes. Resolution is unchanged, so the physical size shrinks with
    /// the pixel count.
    pub fn crop_bleed(&self, bleed_mm: f64) -> Result<PhysicalImage> {
        if bleed_mm < 0.0 {
            return Err(CardPressError::InvalidArgument(
                "bleed must be non-negative".to_string(),
            ));
        }
        if bleed_mm == 0.0 {
            return Ok(self.clone());
        }

        let (w, h) = (self.width_px(), self.height_px());
        let dx = (f64::from(w) * bleed_mm / (self.width_mm() + 2.0 * bleed_mm)) as u32;
        let dy = (f64::from(h) * bleed_mm / (self.height_mm() + 2.0 * bleed_mm)) as u32;
        if dx == 0 && dy == 0 {
            return Ok(self.clone());
        }

        let pixels =
            image::imageops::crop_imm(&self.pixels, dx, dy, w - 2 * dx, h - 2 * dy).to_image();
        Ok(PhysicalImage {
            pixels,
            dots_per_mm_x: self.dots_per_mm_x,
            dots_per_mm_y: self.dots_per_mm_y,
        })
    }
}
