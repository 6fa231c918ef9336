use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardPressError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("layout error: {0}")]
    Layout(String),
    #[error("could not load image \"{path}\": {reason}")]
    ImageLoad { path: String, reason: String },
    #[error("{0}")]
    State(String),
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, CardPressError>;

/// Supported page sizes for the output PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PageSize {
    #[default]
    A4,
    A3,
    Letter,
    Tabloid,
}

impl PageSize {
    /// Base dimensions in portrait aspect (width < height)
    pub fn dimensions_mm(self) -> (f64, f64) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::A3 => (297.0, 420.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::Tabloid => (279.4, 431.8),
        }
    }

    /// Dimensions with the long edge horizontal, the working aspect for
    /// all card sheet layouts.
    pub fn landscape_dimensions_mm(self) -> (f64, f64) {
        let (w, h) = self.dimensions_mm();
        (h, w)
    }

    /// Default card bleed for this page size
    pub fn default_bleed_mm(self) -> f64 {
        match self {
            PageSize::A4 | PageSize::A3 => 3.0,
            PageSize::Letter | PageSize::Tabloid => 1.5,
        }
    }

    /// Default minimum card spacing for this page size
    pub fn default_spacing_mm(self) -> f64 {
        match self {
            PageSize::A4 | PageSize::A3 => 1.0,
            PageSize::Letter | PageSize::Tabloid => 0.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PageSize::A4 => "a4",
            PageSize::A3 => "a3",
            PageSize::Letter => "letter",
            PageSize::Tabloid => "tabloid",
        }
    }
}

impl FromStr for PageSize {
    type Err = CardPressError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "a3" => Ok(PageSize::A3),
            "letter" => Ok(PageSize::Letter),
            "tabloid" => Ok(PageSize::Tabloid),
            other => Err(CardPressError::Layout(format!(
                "unknown page size \"{other}\""
            ))),
        }
    }
}

/// Axis along which a sheet enters a duplex printer. Determines how back
/// sides must be reordered so they line up with the fronts after the flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FeedDirection {
    #[default]
    Portrait,
    Landscape,
}

impl FromStr for FeedDirection {
    type Err = CardPressError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Ok(FeedDirection::Portrait),
            "landscape" => Ok(FeedDirection::Landscape),
            other => Err(CardPressError::InvalidArgument(format!(
                "illegal feed direction \"{other}\""
            ))),
        }
    }
}

/// Direction for quarter-turn rotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RotateDirection {
    Clockwise,
    #[default]
    Anticlockwise,
}
