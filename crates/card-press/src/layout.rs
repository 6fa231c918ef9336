//! Sheet geometry
//!
//! Pure layout math, computed once at composer construction: how many card
//! slots fit in a row, the centered inter-card gap, and the fixed vertical
//! anchors for the front and back card rows on either side of the fold.

use crate::types::{CardPressError, Result};

/// Card slots drawn per page face before pagination. The layout is a fixed
/// two-row fold design, so this is a layout contract rather than a runtime
/// knob.
pub const SLOTS_PER_PAGE: usize = 4;

/// Slot geometry for one page of card fronts/backs. All fields in mm.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub margin_mm: f64,
    pub card_width_mm: f64,
    pub card_height_mm: f64,
    pub bleed_mm: f64,
    pub fold_mm: f64,
    /// Cards fitting in one row
    pub cards_per_row: usize,
    /// Actual inter-card gap after centering (>= requested minimum spacing)
    pub gap_mm: f64,
    /// Left edge of the first slot
    pub x_start_mm: f64,
    /// Top edge of the front card row
    pub front_row_y_mm: f64,
    /// Top edge of the back card row
    pub back_row_y_mm: f64,
}

impl SheetLayout {
    /// Compute the layout for a landscape page.
    ///
    /// Fails with `Layout` when not even a single card fits across the page
    /// width at the requested minimum spacing.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        page_width_mm: f64,
        page_height_mm: f64,
        card_width_mm: f64,
        card_height_mm: f64,
        bleed_mm: f64,
        margin_mm: f64,
        spacing_mm: f64,
        fold_mm: f64,
    ) -> Result<Self> {
        if card_width_mm <= 0.0 || card_height_mm <= 0.0 {
            return Err(CardPressError::InvalidArgument(
                "card dimensions must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("bleed", bleed_mm),
            ("margin", margin_mm),
            ("spacing", spacing_mm),
            ("fold distance", fold_mm),
        ] {
            if value < 0.0 {
                return Err(CardPressError::InvalidArgument(format!(
                    "{name} must be non-negative"
                )));
            }
        }

        let card_total_w = card_width_mm + 2.0 * bleed_mm;
        let card_total_h = card_height_mm + 2.0 * bleed_mm;

        let available = page_width_mm - 2.0 * margin_mm - card_total_w - spacing_mm;
        if available < 0.0 {
            return Err(CardPressError::Layout(
                "cannot fit any cards in the width dimension".to_string(),
            ));
        }
        let cards_per_row = 1 + (available / (card_total_w + spacing_mm)) as usize;

        // Redistribute the leftover width so gaps are equal, including at the
        // row ends, rather than packing cards left at the minimum spacing.
        let leftover =
            page_width_mm - 2.0 * margin_mm - cards_per_row as f64 * card_total_w;
        let gap_mm = leftover / (cards_per_row as f64 + 1.0);
        let x_start_mm = margin_mm + gap_mm;

        // One row of fronts above the fold, one row of backs below it.
        let y_center = page_height_mm / 2.0;
        let front_row_y_mm = y_center - fold_mm - card_total_h;
        let back_row_y_mm = y_center + fold_mm;

        Ok(Self {
            page_width_mm,
            page_height_mm,
            margin_mm,
            card_width_mm,
            card_height_mm,
            bleed_mm,
            fold_mm,
            cards_per_row,
            gap_mm,
            x_start_mm,
            front_row_y_mm,
            back_row_y_mm,
        })
    }

    pub fn card_total_width_mm(&self) -> f64 {
        self.card_width_mm + 2.0 * self.bleed_mm
    }

    pub fn card_total_height_mm(&self) -> f64 {
        self.card_height_mm + 2.0 * self.bleed_mm
    }

    /// Left edge of the slot at the given index in a row
    pub fn slot_x_mm(&self, slot: usize) -> f64 {
        self.x_start_mm + slot as f64 * (self.gap_mm + self.card_total_width_mm())
    }
}
