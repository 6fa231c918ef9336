use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fully-resolved composer configuration.
///
/// The composer never reaches into ambient state; everything it needs is
/// carried here explicitly.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComposerOptions {
    pub page_size: PageSize,
    /// Resolution of the generated pages (dots per inch)
    pub dpi: u32,

    // Card geometry, all in mm
    pub card_width_mm: f64,
    pub card_height_mm: f64,
    /// Bleed each card is printed with
    pub bleed_mm: f64,
    /// Page margin, all sides
    pub margin_mm: f64,
    /// Minimum spacing between cards in a row
    pub spacing_mm: f64,
    /// Distance between a card row and the fold line
    pub fold_mm: f64,

    /// Fronts and backs on separate pages instead of a foldable layout
    pub two_sided: bool,
    pub feed_direction: FeedDirection,
    /// Generate odd-numbered (front side) pages
    pub print_fronts: bool,
    /// Generate even-numbered (back side) pages
    pub print_backs: bool,
    /// Duplex misregistration compensation, applied on even pages only
    pub back_offset_x_mm: f64,
    pub back_offset_y_mm: f64,
}

impl Default for ComposerOptions {
    fn default() -> Self {
        let page_size = PageSize::A4;
        Self {
            page_size,
            dpi: 600,
            card_width_mm: 61.5,
            card_height_mm: 88.0,
            bleed_mm: page_size.default_bleed_mm(),
            margin_mm: 6.0,
            spacing_mm: page_size.default_spacing_mm(),
            fold_mm: 3.0,
            two_sided: false,
            feed_direction: FeedDirection::Portrait,
            print_fronts: true,
            print_backs: true,
            back_offset_x_mm: 0.0,
            back_offset_y_mm: 0.0,
        }
    }
}

impl ComposerOptions {
    /// Options with the page-size dependent defaults for bleed and spacing
    pub fn for_page_size(page_size: PageSize) -> Self {
        Self {
            page_size,
            bleed_mm: page_size.default_bleed_mm(),
            spacing_mm: page_size.default_spacing_mm(),
            ..Default::default()
        }
    }

    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options: Self = serde_json::from_slice(&bytes).map_err(|e| {
            CardPressError::InvalidArgument(format!("failed to parse options file: {e}"))
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            CardPressError::InvalidArgument(format!("failed to serialize options: {e}"))
        })?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.dpi == 0 {
            return Err(CardPressError::InvalidArgument(
                "dpi must be positive".to_string(),
            ));
        }
        if self.card_width_mm <= 0.0 || self.card_height_mm <= 0.0 {
            return Err(CardPressError::InvalidArgument(
                "card dimensions must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("bleed", self.bleed_mm),
            ("margin", self.margin_mm),
            ("spacing", self.spacing_mm),
            ("fold distance", self.fold_mm),
        ] {
            if value < 0.0 {
                return Err(CardPressError::InvalidArgument(format!(
                    "{name} must be non-negative"
                )));
            }
        }
        if !self.print_fronts && !self.print_backs {
            return Err(CardPressError::InvalidArgument(
                "at least one of front and back pages must be enabled".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ComposerOptions::default().validate().unwrap();
    }

    #[test]
    fn page_size_defaults_differ() {
        let a4 = ComposerOptions::for_page_size(PageSize::A4);
        let letter = ComposerOptions::for_page_size(PageSize::Letter);
        assert_eq!(a4.bleed_mm, 3.0);
        assert_eq!(a4.spacing_mm, 1.0);
        assert_eq!(letter.bleed_mm, 1.5);
        assert_eq!(letter.spacing_mm, 0.0);
    }

    #[test]
    fn negative_bleed_rejected() {
        let options = ComposerOptions {
            bleed_mm: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(CardPressError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_page_subset_rejected() {
        let options = ComposerOptions {
            print_fronts: false,
            print_backs: false,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
