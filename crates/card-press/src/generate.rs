//! High-level generation pipeline
//!
//! Ties the pieces together: take parsed card batches, run them through a
//! [`PageComposer`], and commit (or clean up) the output file. The sync core
//! does all the work; async wrappers move it off the runtime threads with
//! `spawn_blocking`.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::canvas::Canvas;
use crate::cardlist::CardBatch;
use crate::compose::PageComposer;
use crate::graphics::{AspectRotation, ImageTransform, PhysicalImage};
use crate::options::ComposerOptions;
use crate::types::{Result, RotateDirection};

/// Everything needed to produce one PDF
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub output: PathBuf,
    pub options: ComposerOptions,
    /// Aspect auto-rotation applied to every loaded image; `None` disables
    /// rotation entirely
    pub transform: Option<AspectRotation>,
    pub batches: Vec<CardBatch>,
    /// Delete a pre-existing output file instead of failing
    pub overwrite: bool,
}

impl ComposeRequest {
    pub fn new(output: impl Into<PathBuf>, options: ComposerOptions) -> Self {
        Self {
            output: output.into(),
            options,
            transform: Some(AspectRotation::default()),
            batches: Vec::new(),
            overwrite: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeSummary {
    pub cards: usize,
    pub pages: usize,
}

/// Compose a PDF on a blocking worker thread
pub async fn compose_pdf(request: ComposeRequest) -> Result<ComposeSummary> {
    tokio::task::spawn_blocking(move || compose_sync(&request)).await?
}

/// Compose a PDF synchronously.
///
/// On any failure after the composer opens, the partial output is aborted
/// and removed; an error never leaves a half-written file behind.
pub fn compose_sync(request: &ComposeRequest) -> Result<ComposeSummary> {
    if request.overwrite && request.output.exists() {
        std::fs::remove_file(&request.output)?;
    }
    let mut composer = PageComposer::create(&request.output, request.options.clone())?;
    let result = draw_batches(&mut composer, request).and_then(|cards| {
        composer.finish()?;
        Ok(cards)
    });
    match result {
        Ok(cards) => {
            let summary = ComposeSummary {
                cards,
                pages: composer.page_count(),
            };
            info!(
                "composed {} cards over {} pages into {}",
                summary.cards,
                summary.pages,
                request.output.display()
            );
            Ok(summary)
        }
        Err(err) => {
            if !composer.is_closed() {
                // Best effort cleanup; the original error wins.
                let _ = composer.abort(true);
            }
            Err(err)
        }
    }
}

/// Load and draw every batch. Each batch's back image is loaded once and
/// shared across its fronts; in folded mode the back is pre-rotated a half
/// turn so the fold brings front and back into alignment.
fn draw_batches<C: Canvas>(
    composer: &mut PageComposer<C>,
    request: &ComposeRequest,
) -> Result<usize> {
    let transform = request
        .transform
        .as_ref()
        .map(|t| t as &dyn ImageTransform);
    let folded = !request.options.two_sided;

    let mut cards = 0;
    for batch in &request.batches {
        let back = match &batch.back_image {
            Some(path) => {
                debug!("loading back image {}", path.display());
                let image = composer.load_card(path, transform, batch.back_bleed_mm)?;
                Some(if folded {
                    image.rotated_half_circle()
                } else {
                    image
                })
            }
            None => None,
        };
        for front in &batch.fronts {
            debug!("adding card {}", front.display());
            let image = composer.load_card(front, transform, batch.front_bleed_mm)?;
            composer.draw_card(Some(image), back.clone())?;
            cards += 1;
        }
    }
    Ok(cards)
}

/// When to apply the quarter-turn rotation in a standalone image adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationMode {
    #[default]
    Never,
    Always,
    /// Rotate only if the image is physically wider than tall
    ToPortrait,
    /// Rotate only if the image is physically taller than wide
    ToLandscape,
}

/// A standalone image edit: rotate, then resize, then add or crop bleed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageAdjustment {
    pub rotation: RotationMode,
    pub rotate_direction: RotateDirection,
    /// Target physical size in mm, applied after rotation
    pub resize_mm: Option<(f64, f64)>,
    /// Positive adds bleed, negative crops it
    pub bleed_mm: f64,
}

impl Default for ImageAdjustment {
    fn default() -> Self {
        Self {
            rotation: RotationMode::Never,
            rotate_direction: RotateDirection::Anticlockwise,
            resize_mm: None,
            bleed_mm: 0.0,
        }
    }
}

/// Apply an adjustment to an in-memory image
pub fn adjust_image(image: PhysicalImage, adjustment: &ImageAdjustment) -> Result<PhysicalImage> {
    let rotate = match adjustment.rotation {
        RotationMode::Never => false,
        RotationMode::Always => true,
        RotationMode::ToPortrait => image.width_mm() > image.height_mm(),
        RotationMode::ToLandscape => image.width_mm() < image.height_mm(),
    };
    let mut image = if rotate {
        match adjustment.rotate_direction {
            RotateDirection::Clockwise => image.rotated_clockwise(),
            RotateDirection::Anticlockwise => image.rotated_anticlockwise(),
        }
    } else {
        image
    };

    if let Some((width_mm, height_mm)) = adjustment.resize_mm {
        image.set_width_mm(width_mm)?;
        image.set_height_mm(height_mm)?;
    }

    if adjustment.bleed_mm > 0.0 {
        image = image.add_bleed(adjustment.bleed_mm)?;
    } else if adjustment.bleed_mm < 0.0 {
        image = image.crop_bleed(-adjustment.bleed_mm)?;
    }
    Ok(image)
}

/// Load, adjust, and save one image file on a blocking worker thread
pub async fn adjust_image_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    adjustment: ImageAdjustment,
) -> Result<()> {
    let input = input.as_ref().to_path_buf();
    let output = output.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || {
        let image = PhysicalImage::open(&input)?;
        let image = adjust_image(image, &adjustment)?;
        image.save(&output)?;
        debug!("saved adjusted image {}", output.display());
        Ok(())
    })
    .await?
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    use super::*;
    use crate::cardlist::CardBatch;
    use crate::types::CardPressError;

    fn write_png(dir: &TempDir, name: &str, w: u32, h: u32, rgba: [u8; 4]) -> PathBuf {
        let path = dir.path().join(name);
        RgbaImage::from_pixel(w, h, Rgba(rgba)).save(&path).unwrap();
        path
    }

    fn small_options() -> ComposerOptions {
        // Low dpi keeps page rasters small in tests
        ComposerOptions {
            dpi: 30,
            ..Default::default()
        }
    }

    #[test]
    fn compose_writes_a_pdf() {
        let dir = TempDir::new().unwrap();
        let front = write_png(&dir, "front.png", 40, 60, [200, 40, 40, 255]);
        let back = write_png(&dir, "back.png", 40, 60, [40, 40, 200, 255]);

        let mut request = ComposeRequest::new(dir.path().join("out.pdf"), small_options());
        request.batches.push(CardBatch {
            back_image: Some(back),
            back_bleed_mm: 0.0,
            front_bleed_mm: 0.0,
            fronts: vec![front.clone(), front],
        });

        let summary = compose_sync(&request).unwrap();
        assert_eq!(summary, ComposeSummary { cards: 2, pages: 1 });
        let bytes = std::fs::read(&request.output).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn failed_compose_removes_partial_output() {
        let dir = TempDir::new().unwrap();
        let front = write_png(&dir, "front.png", 40, 60, [0, 0, 0, 255]);

        let mut request = ComposeRequest::new(dir.path().join("out.pdf"), small_options());
        request.batches.push(CardBatch {
            back_image: None,
            back_bleed_mm: 0.0,
            front_bleed_mm: 0.0,
            fronts: vec![front, dir.path().join("missing.png")],
        });

        let err = compose_sync(&request).unwrap_err();
        assert!(matches!(err, CardPressError::ImageLoad { .. }));
        assert!(!request.output.exists());
    }

    #[test]
    fn existing_output_requires_overwrite() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.pdf");
        std::fs::write(&output, b"stale").unwrap();

        let mut request = ComposeRequest::new(&output, small_options());
        assert!(matches!(
            compose_sync(&request),
            Err(CardPressError::Layout(_))
        ));

        request.overwrite = true;
        let summary = compose_sync(&request).unwrap();
        assert_eq!(summary.cards, 0);
        assert!(std::fs::read(&output).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn adjustment_applies_rotate_resize_bleed_in_order() {
        let image = {
            let mut img = PhysicalImage::new(RgbaImage::from_pixel(
                200,
                100,
                Rgba([10, 10, 10, 255]),
            ));
            img.set_width_mm(88.0).unwrap();
            img.set_height_mm(61.5).unwrap();
            img
        };
        let adjustment = ImageAdjustment {
            rotation: RotationMode::ToPortrait,
            resize_mm: Some((61.5, 88.0)),
            bleed_mm: 3.0,
            ..Default::default()
        };
        let out = adjust_image(image, &adjustment).unwrap();
        // Rotated to portrait, resized, then padded by 3 mm per side.
        assert!(out.height_px() > out.width_px());
        assert!((out.width_mm() - 67.5).abs() < 1e-9);
        assert!((out.height_mm() - 94.0).abs() < 1e-9);
    }

    #[test]
    fn negative_bleed_crops() {
        let mut img = PhysicalImage::new(RgbaImage::from_pixel(100, 160, Rgba([1, 1, 1, 255])));
        img.set_width_mm(67.5).unwrap();
        img.set_height_mm(94.0).unwrap();
        let adjustment = ImageAdjustment {
            bleed_mm: -3.0,
            ..Default::default()
        };
        let out = adjust_image(img.clone(), &adjustment).unwrap();
        assert!(out.width_px() < img.width_px());
        assert!(out.height_px() < img.height_px());
    }

    #[test]
    fn to_landscape_skips_landscape_images() {
        let mut img = PhysicalImage::new(RgbaImage::from_pixel(200, 100, Rgba([1, 1, 1, 255])));
        img.set_width_mm(88.0).unwrap();
        img.set_height_mm(61.5).unwrap();
        let adjustment = ImageAdjustment {
            rotation: RotationMode::ToLandscape,
            ..Default::default()
        };
        let out = adjust_image(img.clone(), &adjustment).unwrap();
        assert_eq!(out, img);
    }

    #[tokio::test]
    async fn async_image_adjustment_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let input = write_png(&dir, "in.png", 50, 80, [9, 9, 9, 255]);
        let output = dir.path().join("out.png");
        let adjustment = ImageAdjustment {
            rotation: RotationMode::Always,
            ..Default::default()
        };
        adjust_image_file(&input, &output, adjustment).await.unwrap();
        let saved = PhysicalImage::open(&output).unwrap();
        assert_eq!((saved.width_px(), saved.height_px()), (80, 50));
    }
}
