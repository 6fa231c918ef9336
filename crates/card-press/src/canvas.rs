//! Drawing-surface capability
//!
//! The composer draws through the [`Canvas`] trait in device pixels; the mm
//! to pixel mapping is `px = round(mm * dpi / 25.4)`. The production
//! implementation rasterizes each page at the configured dpi and embeds the
//! page raster into a printpdf document.

use std::io::Cursor;

use image::{Rgba, RgbaImage};
use printpdf::{Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Pt, XObjectTransform};

use crate::graphics::{PhysicalImage, BLACK, WHITE};
use crate::types::{CardPressError, Result};

/// Convert a physical offset to device pixels at the given resolution
pub fn mm_to_px(mm: f64, dpi: u32) -> i64 {
    (mm * f64::from(dpi) / 25.4).round() as i64
}

/// Convert device pixels back to a physical offset
pub fn px_to_mm(px: i64, dpi: u32) -> f64 {
    px as f64 * 25.4 / f64::from(dpi)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dotted,
}

/// Paginated drawing surface addressed in device pixels.
///
/// A fresh surface starts with its first page open; `begin_page` closes the
/// current page and opens the next one. `finish` closes the last page and
/// returns the encoded document.
pub trait Canvas {
    fn begin_page(&mut self) -> Result<()>;
    fn draw_image(&mut self, x_px: i64, y_px: i64, image: &PhysicalImage) -> Result<()>;
    fn draw_line(
        &mut self,
        x0_px: i64,
        y0_px: i64,
        x1_px: i64,
        y1_px: i64,
        width_px: u32,
        style: LineStyle,
    ) -> Result<()>;
    /// White-filled rectangle with a black border
    fn draw_rect(
        &mut self,
        x_px: i64,
        y_px: i64,
        width_px: u32,
        height_px: u32,
        stroke_px: u32,
    ) -> Result<()>;
    fn finish(&mut self) -> Result<Vec<u8>>;
}

/// PDF canvas rasterizing pages at a fixed dpi
pub struct PdfCanvas {
    doc: PdfDocument,
    page_width_mm: f64,
    page_height_mm: f64,
    page_width_px: u32,
    page_height_px: u32,
    dpi: u32,
    page: RgbaImage,
}

impl PdfCanvas {
    pub fn new(page_width_mm: f64, page_height_mm: f64, dpi: u32) -> Result<Self> {
        if dpi == 0 {
            return Err(CardPressError::InvalidArgument(
                "dpi must be positive".to_string(),
            ));
        }
        let page_width_px = mm_to_px(page_width_mm, dpi) as u32;
        let page_height_px = mm_to_px(page_height_mm, dpi) as u32;
        Ok(Self {
            doc: PdfDocument::new("card sheets"),
            page_width_mm,
            page_height_mm,
            page_width_px,
            page_height_px,
            dpi,
            page: RgbaImage::from_pixel(page_width_px, page_height_px, WHITE),
        })
    }

    /// Close the open page raster and append it to the document
    fn flush_page(&mut self) -> Result<()> {
        let raster = std::mem::replace(
            &mut self.page,
            RgbaImage::from_pixel(self.page_width_px, self.page_height_px, WHITE),
        );

        // Pages are fully opaque; dropping alpha keeps the embedded stream
        // smaller.
        let rgb = image::DynamicImage::ImageRgba8(raster).to_rgb8();
        let mut png = Cursor::new(Vec::new());
        rgb.write_to(&mut png, image::ImageFormat::Png)?;

        let mut warnings = Vec::new();
        let raw = printpdf::RawImage::decode_from_bytes(png.get_ref(), &mut warnings)
            .map_err(|e| CardPressError::Pdf(e.to_string()))?;
        let image_id = self.doc.add_image(&raw);

        let ops = vec![Op::UseXobject {
            id: image_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                dpi: Some(self.dpi as f32),
                ..Default::default()
            },
        }];
        self.doc.pages.push(PdfPage::new(
            Mm(self.page_width_mm as f32),
            Mm(self.page_height_mm as f32),
            ops,
        ));
        Ok(())
    }

    fn put_px(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.page_width_px && (y as u32) < self.page_height_px {
            self.page.put_pixel(x as u32, y as u32, color);
        }
    }

    fn fill_rect_px(&mut self, x: i64, y: i64, w: i64, h: i64, color: Rgba<u8>) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.put_px(xx, yy, color);
            }
        }
    }
}

impl Canvas for PdfCanvas {
    fn begin_page(&mut self) -> Result<()> {
        self.flush_page()
    }

    fn draw_image(&mut self, x_px: i64, y_px: i64, image: &PhysicalImage) -> Result<()> {
        image::imageops::replace(&mut self.page, image.pixels(), x_px, y_px);
        Ok(())
    }

    fn draw_line(
        &mut self,
        x0_px: i64,
        y0_px: i64,
        x1_px: i64,
        y1_px: i64,
        width_px: u32,
        style: LineStyle,
    ) -> Result<()> {
        let w = i64::from(width_px.max(1));
        let half = w / 2;
        // Guide lines are axis-aligned; walk the long axis and stamp a
        // square brush, skipping gaps for the dotted style.
        let (dx, dy) = (x1_px - x0_px, y1_px - y0_px);
        let steps = dx.abs().max(dy.abs());
        let dash_period = 3 * w;
        for i in 0..=steps {
            if style == LineStyle::Dotted && (i / dash_period) % 3 != 0 {
                continue;
            }
            let x = x0_px + if steps == 0 { 0 } else { dx * i / steps };
            let y = y0_px + if steps == 0 { 0 } else { dy * i / steps };
            self.fill_rect_px(x - half, y - half, w, w, BLACK);
        }
        Ok(())
    }

    fn draw_rect(
        &mut self,
        x_px: i64,
        y_px: i64,
        width_px: u32,
        height_px: u32,
        stroke_px: u32,
    ) -> Result<()> {
        let (w, h) = (i64::from(width_px), i64::from(height_px));
        self.fill_rect_px(x_px, y_px, w, h, WHITE);
        let x1 = x_px + w - 1;
        let y1 = y_px + h - 1;
        self.draw_line(x_px, y_px, x1, y_px, stroke_px, LineStyle::Solid)?;
        self.draw_line(x_px, y1, x1, y1, stroke_px, LineStyle::Solid)?;
        self.draw_line(x_px, y_px, x_px, y1, stroke_px, LineStyle::Solid)?;
        self.draw_line(x1, y_px, x1, y1, stroke_px, LineStyle::Solid)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        self.flush_page()?;
        let mut warnings = Vec::new();
        Ok(self.doc.save(&PdfSaveOptions::default(), &mut warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mm_to_px_rounds_at_dpi() {
        assert_eq!(mm_to_px(25.4, 600), 600);
        assert_eq!(mm_to_px(1.0, 600), 24); // 23.62 rounds up
        assert_eq!(mm_to_px(0.0, 600), 0);
    }

    #[test]
    fn px_to_mm_inverts_whole_inches() {
        assert!((px_to_mm(600, 600) - 25.4).abs() < 1e-9);
    }

    #[test]
    fn finished_document_is_pdf() {
        let mut canvas = PdfCanvas::new(297.0, 210.0, 60).unwrap();
        canvas
            .draw_line(10, 10, 200, 10, 2, LineStyle::Solid)
            .unwrap();
        canvas.begin_page().unwrap();
        let bytes = canvas.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn drawing_clips_at_page_bounds() {
        let mut canvas = PdfCanvas::new(50.0, 50.0, 30).unwrap();
        // Way outside the page; must not panic.
        canvas
            .draw_line(-100, -100, 5000, -100, 5, LineStyle::Solid)
            .unwrap();
        canvas.draw_rect(-10, -10, 20, 20, 3).unwrap();
    }
}
