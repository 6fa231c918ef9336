//! Card sheet composition
//!
//! [`PageComposer`] accepts a stream of (front, back) card pairs and turns
//! them into drawing calls on a paginated [`Canvas`]:
//!
//! 1. Folded mode draws each pair immediately, front row above the fold and
//!    back row below it, so a folded sheet yields double-sided cards.
//! 2. Two-sided mode buffers pairs until a full page worth is collected,
//!    then emits a front page and a back page with the backs reordered for
//!    the printer's feed direction.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::canvas::{mm_to_px, Canvas, LineStyle, PdfCanvas};
use crate::graphics::{ImageTransform, PhysicalImage};
use crate::layout::{SheetLayout, SLOTS_PER_PAGE};
use crate::options::ComposerOptions;
use crate::types::{CardPressError, FeedDirection, Result};

/// One card: optional front and back image. A missing side renders as a
/// blank white placeholder.
pub type CardPair = (Option<PhysicalImage>, Option<PhysicalImage>);

const FOLD_LINE_PX: u32 = 2;
const CUT_LINE_PX: u32 = 2;
const SLOT_LINE_PX: u32 = 5;

/// Streams card pairs onto pages of a canvas.
///
/// The canvas resource is owned exclusively by the composer and released
/// exactly once, through either [`finish`](Self::finish) (commit) or
/// [`abort`](Self::abort) (discard); calling either a second time is a state
/// error.
pub struct PageComposer<C: Canvas> {
    canvas: C,
    output: PathBuf,
    options: ComposerOptions,
    layout: SheetLayout,
    /// Slot index on the current page, 0..SLOTS_PER_PAGE
    slot: usize,
    /// 1-based physical page number
    page_number: usize,
    /// Pending pairs for two-sided mode
    buffer: Vec<CardPair>,
    drawing_started: bool,
    done: bool,
}

impl PageComposer<PdfCanvas> {
    /// Composer writing through the PDF canvas.
    ///
    /// Fails with `Layout` when the output file already exists; there is no
    /// implicit overwrite.
    pub fn create(output: impl Into<PathBuf>, options: ComposerOptions) -> Result<Self> {
        let (page_w, page_h) = options.page_size.landscape_dimensions_mm();
        let canvas = PdfCanvas::new(page_w, page_h, options.dpi)?;
        Self::with_canvas(canvas, output, options)
    }
}

impl<C: Canvas> PageComposer<C> {
    pub fn with_canvas(canvas: C, output: impl Into<PathBuf>, options: ComposerOptions) -> Result<Self> {
        options.validate()?;
        let output = output.into();
        if output.exists() {
            return Err(CardPressError::Layout(format!(
                "output file {} already exists",
                output.display()
            )));
        }
        let (page_w, page_h) = options.page_size.landscape_dimensions_mm();
        let layout = SheetLayout::new(
            page_w,
            page_h,
            options.card_width_mm,
            options.card_height_mm,
            options.bleed_mm,
            options.margin_mm,
            options.spacing_mm,
            options.fold_mm,
        )?;
        info!(
            "opened {} ({} landscape, {} cards per row)",
            output.display(),
            options.page_size.name(),
            layout.cards_per_row
        );
        Ok(Self {
            canvas,
            output,
            options,
            layout,
            slot: 0,
            page_number: 1,
            buffer: Vec::new(),
            drawing_started: false,
            done: false,
        })
    }

    pub fn cards_per_row(&self) -> usize {
        self.layout.cards_per_row
    }

    /// Physical pages emitted so far
    pub fn page_count(&self) -> usize {
        self.page_number
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    pub fn is_closed(&self) -> bool {
        self.done
    }

    /// Choose which two-sided pages to generate: odd-numbered (fronts)
    /// and/or even-numbered (backs). Must be called before drawing starts.
    pub fn set_page_subset(&mut self, fronts: bool, backs: bool) -> Result<()> {
        self.ensure_configurable()?;
        if !fronts && !backs {
            return Err(CardPressError::InvalidArgument(
                "at least one of front and back pages must be enabled".to_string(),
            ));
        }
        self.options.print_fronts = fronts;
        self.options.print_backs = backs;
        Ok(())
    }

    /// Offset applied to everything on even-numbered pages, compensating
    /// duplex misregistration. Must be called before drawing starts.
    pub fn set_back_offset(&mut self, x_mm: f64, y_mm: f64) -> Result<()> {
        self.ensure_configurable()?;
        self.options.back_offset_x_mm = x_mm;
        self.options.back_offset_y_mm = y_mm;
        Ok(())
    }

    /// Feed direction for two-sided printing. Must be called before drawing
    /// starts.
    pub fn set_feed_direction(&mut self, feed_direction: FeedDirection) -> Result<()> {
        self.ensure_configurable()?;
        self.options.feed_direction = feed_direction;
        Ok(())
    }

    /// Load a card image and normalize it for placement: apply the optional
    /// aspect transform, adjust from the bleed already present in the file
    /// to the target bleed, and scale to the slot's pixel size.
    pub fn load_card(
        &self,
        path: impl AsRef<Path>,
        transform: Option<&dyn ImageTransform>,
        bleed_mm: f64,
    ) -> Result<PhysicalImage> {
        let image = PhysicalImage::open(path)?;
        self.prepare_card(image, transform, bleed_mm)
    }

    /// Normalization step of [`load_card`](Self::load_card) for an image
    /// that is already in memory. `bleed_mm` is the bleed the image already
    /// carries.
    pub fn prepare_card(
        &self,
        image: PhysicalImage,
        transform: Option<&dyn ImageTransform>,
        bleed_mm: f64,
    ) -> Result<PhysicalImage> {
        if bleed_mm < 0.0 {
            return Err(CardPressError::InvalidArgument(
                "bleed must be non-negative".to_string(),
            ));
        }
        let mut image = match transform {
            Some(t) => t.apply(image),
            None => image,
        };
        image.set_width_mm(self.options.card_width_mm + 2.0 * bleed_mm)?;
        image.set_height_mm(self.options.card_height_mm + 2.0 * bleed_mm)?;

        let delta = self.options.bleed_mm - bleed_mm;
        if delta > 0.0 {
            image = image.add_bleed(delta)?;
        } else if delta < 0.0 {
            image = image.crop_bleed(-delta)?;
        }

        let w_px = self.px(self.layout.card_total_width_mm()) as u32;
        let h_px = self.px(self.layout.card_total_height_mm()) as u32;
        Ok(image.scaled(w_px, h_px))
    }

    /// Add one card to the document.
    ///
    /// In folded mode the pair is drawn immediately; the back image is
    /// expected to be pre-rotated 180 degrees by the caller so the fold
    /// aligns the faces. In two-sided mode the pair is buffered and drawn
    /// when a full page is collected or at [`finish`](Self::finish).
    pub fn draw_card(
        &mut self,
        front: Option<PhysicalImage>,
        back: Option<PhysicalImage>,
    ) -> Result<()> {
        self.ensure_open()?;
        self.drawing_started = true;

        if self.options.two_sided {
            self.buffer.push((front, back));
            if self.buffer.len() == 2 * self.layout.cards_per_row {
                self.flush_buffer()?;
            }
            return Ok(());
        }

        self.draw_slot(front.as_ref(), back.as_ref())
    }

    /// Flush pending two-sided pages, close the canvas, and commit the
    /// output file (write-then-rename, never a half-written artifact).
    pub fn finish(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.options.two_sided {
            self.flush_buffer()?;
        }
        let bytes = self.canvas.finish()?;
        self.done = true;

        let staging = self.output.with_extension("tmp");
        std::fs::write(&staging, &bytes)?;
        std::fs::rename(&staging, &self.output)?;
        info!("saved {} ({} pages)", self.output.display(), self.page_number);
        Ok(())
    }

    /// Discard the document. With `remove_output` any committed or staged
    /// output file is deleted.
    pub fn abort(&mut self, remove_output: bool) -> Result<()> {
        if self.done {
            return Err(CardPressError::State(
                "cannot close or abort more than once".to_string(),
            ));
        }
        self.done = true;
        if remove_output {
            for path in [&self.output, &self.output.with_extension("tmp")] {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.done {
            return Err(CardPressError::State(
                "writing was closed or aborted".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_configurable(&self) -> Result<()> {
        if self.drawing_started || self.done {
            return Err(CardPressError::State(
                "cannot reconfigure after drawing started".to_string(),
            ));
        }
        Ok(())
    }

    fn px(&self, mm: f64) -> i64 {
        mm_to_px(mm, self.options.dpi)
    }

    /// Draw one slot (front row + back row) on the current page, breaking
    /// the page first when all slots are used.
    fn draw_slot(
        &mut self,
        front: Option<&PhysicalImage>,
        back: Option<&PhysicalImage>,
    ) -> Result<()> {
        if self.slot == SLOTS_PER_PAGE {
            self.start_new_page()?;
        }
        let (off_x, off_y) = self.page_offset_px();

        if self.slot == 0 {
            self.draw_page_guides(off_x, off_y)?;
        }

        // Vertical cut lines at the card's trim edges, full page height
        let x_mm = self.layout.slot_x_mm(self.slot);
        let y0 = self.px(self.layout.margin_mm);
        let y1 = self.px(self.layout.page_height_mm - self.layout.margin_mm);
        for dx_mm in [
            self.layout.bleed_mm,
            self.layout.bleed_mm + self.layout.card_width_mm,
        ] {
            let x = self.px(x_mm + dx_mm);
            self.canvas
                .draw_line(x + off_x, y0 + off_y, x + off_x, y1 + off_y, SLOT_LINE_PX, LineStyle::Solid)?;
        }

        let w_px = self.px(self.layout.card_total_width_mm()) as u32;
        let h_px = self.px(self.layout.card_total_height_mm()) as u32;
        for (side, y_mm) in [
            (front, self.layout.front_row_y_mm),
            (back, self.layout.back_row_y_mm),
        ] {
            let x = self.px(x_mm) + off_x;
            let y = self.px(y_mm) + off_y;
            match side {
                Some(image) => self.canvas.draw_image(x, y, image)?,
                None => self.canvas.draw_rect(x, y, w_px, h_px, SLOT_LINE_PX)?,
            }
        }

        self.slot += 1;
        Ok(())
    }

    fn start_new_page(&mut self) -> Result<()> {
        self.canvas.begin_page()?;
        self.page_number += 1;
        self.slot = 0;
        debug!("starting page {}", self.page_number);
        Ok(())
    }

    /// Even-numbered pages carry the duplex compensation offset
    fn page_offset_px(&self) -> (i64, i64) {
        if self.page_number % 2 == 1 {
            (0, 0)
        } else {
            (
                self.px(self.options.back_offset_x_mm),
                self.px(self.options.back_offset_y_mm),
            )
        }
    }

    /// Fold line (folded mode) and the horizontal cut lines bounding both
    /// card rows; drawn once per page, before the first slot.
    fn draw_page_guides(&mut self, off_x: i64, off_y: i64) -> Result<()> {
        let x0 = self.px(self.layout.margin_mm);
        let x1 = self.px(self.layout.page_width_mm - self.layout.margin_mm);

        if !self.options.two_sided {
            let y = self.px(self.layout.page_height_mm / 2.0);
            self.canvas
                .draw_line(x0 + off_x, y + off_y, x1 + off_x, y + off_y, FOLD_LINE_PX, LineStyle::Dotted)?;
        }

        for row_y_mm in [self.layout.front_row_y_mm, self.layout.back_row_y_mm] {
            let trim_top = row_y_mm + self.layout.bleed_mm;
            for y_mm in [trim_top, trim_top + self.layout.card_height_mm] {
                let y = self.px(y_mm);
                self.canvas
                    .draw_line(x0 + off_x, y + off_y, x1 + off_x, y + off_y, CUT_LINE_PX, LineStyle::Solid)?;
            }
        }
        Ok(())
    }

    /// Draw the buffered two-sided pairs: one page of fronts and one page of
    /// backs (per the enabled subset), with backs reordered for the feed
    /// direction so they line up after the duplex flip.
    fn flush_buffer(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let per_row = self.layout.cards_per_row;
        let capacity = 2 * per_row;

        let mut fronts = Vec::with_capacity(capacity);
        let mut backs = Vec::with_capacity(capacity);
        for (front, back) in self.buffer.drain(..) {
            fronts.push(front);
            backs.push(back);
        }
        fronts.resize_with(capacity, || None);
        backs.resize_with(capacity, || None);

        let fronts_bottom = fronts.split_off(per_row);
        let fronts_top = fronts;

        let (backs_top, backs_bottom) = match self.options.feed_direction {
            FeedDirection::Landscape => {
                // The sheet flips along its long axis: each back row mirrors
                // its front row left to right.
                let mut bottom = backs.split_off(per_row);
                let mut top = backs;
                top.reverse();
                bottom.reverse();
                (top, bottom)
            }
            FeedDirection::Portrait => {
                // The sheet flips along its short axis: rows trade places and
                // every back turns 180 degrees. Matches observed printer
                // behavior; see DESIGN.md before changing.
                let rotate = |row: &[Option<PhysicalImage>]| {
                    row.iter()
                        .map(|side| side.as_ref().map(PhysicalImage::rotated_half_circle))
                        .collect::<Vec<_>>()
                };
                (rotate(&backs[per_row..]), rotate(&backs[..per_row]))
            }
        };

        let mut sides = Vec::new();
        if self.options.print_fronts {
            sides.push((fronts_top, fronts_bottom));
        }
        if self.options.print_backs {
            sides.push((backs_top, backs_bottom));
        }

        for (tops, bottoms) in sides {
            if self.slot != 0 {
                self.start_new_page()?;
            }
            for (top, bottom) in tops.iter().zip(bottoms.iter()) {
                self.draw_slot(top.as_ref(), bottom.as_ref())?;
            }
        }
        Ok(())
    }
}
