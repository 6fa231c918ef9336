//! Card list parsing and writing
//!
//! A card list is a plain-text stream of batches. Each batch is:
//!
//! ```text
//! <back image path, or None for a blank back>
//! <bleed already present in the back image, mm>
//! <bleed already present in the front images, mm>
//! <front image path>
//! <front image path>
//! ...
//! <blank line>
//! ```
//!
//! Batches share one back image and one pair of bleed values; concatenating
//! lists concatenates their batches.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::types::{CardPressError, Result};

/// Literal used in place of a back image path for a blank back side
const BLANK_BACK: &str = "None";

/// One batch of cards sharing a back image and bleed values
#[derive(Debug, Clone, PartialEq)]
pub struct CardBatch {
    /// Back image path; `None` renders blank backs
    pub back_image: Option<PathBuf>,
    /// Bleed already present in the back image, in mm
    pub back_bleed_mm: f64,
    /// Bleed already present in each front image, in mm
    pub front_bleed_mm: f64,
    pub fronts: Vec<PathBuf>,
}

impl CardBatch {
    pub fn new(back_image: Option<PathBuf>) -> Self {
        Self {
            back_image,
            back_bleed_mm: 0.0,
            front_bleed_mm: 0.0,
            fronts: Vec::new(),
        }
    }
}

enum ParseState {
    /// Between batches; next non-blank line starts a header
    Idle,
    /// Back path read, expecting the back bleed value
    WantBackBleed(CardBatch),
    /// Back bleed read, expecting the front bleed value
    WantFrontBleed(CardBatch),
    /// Header complete, collecting front paths
    Fronts(CardBatch),
}

/// Parse a card list.
///
/// Fails with `InvalidArgument` on malformed bleed values and on a batch
/// header cut short by a blank line or the end of input; a trailing batch
/// without its closing blank line is accepted.
pub fn parse_card_list(text: &str) -> Result<Vec<CardBatch>> {
    let mut batches = Vec::new();
    let mut state = ParseState::Idle;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches(['\r']);
        let number = index + 1;

        if line.trim().is_empty() {
            state = match state {
                ParseState::Idle => ParseState::Idle,
                ParseState::Fronts(batch) => {
                    batches.push(batch);
                    ParseState::Idle
                }
                ParseState::WantBackBleed(_) | ParseState::WantFrontBleed(_) => {
                    return Err(CardPressError::InvalidArgument(format!(
                        "line {number}: batch header interrupted by a blank line"
                    )));
                }
            };
            continue;
        }

        state = match state {
            ParseState::Idle => {
                let back = if line == BLANK_BACK {
                    None
                } else {
                    Some(PathBuf::from(line))
                };
                ParseState::WantBackBleed(CardBatch::new(back))
            }
            ParseState::WantBackBleed(mut batch) => {
                batch.back_bleed_mm = parse_bleed(line, number, "back")?;
                ParseState::WantFrontBleed(batch)
            }
            ParseState::WantFrontBleed(mut batch) => {
                batch.front_bleed_mm = parse_bleed(line, number, "front")?;
                ParseState::Fronts(batch)
            }
            ParseState::Fronts(mut batch) => {
                batch.fronts.push(PathBuf::from(line));
                ParseState::Fronts(batch)
            }
        };
    }

    match state {
        ParseState::Idle => {}
        ParseState::Fronts(batch) => batches.push(batch),
        ParseState::WantBackBleed(_) | ParseState::WantFrontBleed(_) => {
            return Err(CardPressError::InvalidArgument(
                "card list ends in the middle of a batch header".to_string(),
            ));
        }
    }
    Ok(batches)
}

fn parse_bleed(line: &str, number: usize, side: &str) -> Result<f64> {
    let value: f64 = line.trim().parse().map_err(|_| {
        CardPressError::InvalidArgument(format!(
            "line {number}: expected {side} bleed in mm, got {line:?}"
        ))
    })?;
    if value < 0.0 {
        return Err(CardPressError::InvalidArgument(format!(
            "line {number}: {side} bleed must be non-negative"
        )));
    }
    Ok(value)
}

/// Render batches back into the card list text format
pub fn write_card_list(batches: &[CardBatch]) -> String {
    let mut out = String::new();
    for batch in batches {
        match &batch.back_image {
            Some(path) => {
                let _ = writeln!(out, "{}", path.display());
            }
            None => {
                let _ = writeln!(out, "{BLANK_BACK}");
            }
        }
        let _ = writeln!(out, "{}", batch.back_bleed_mm);
        let _ = writeln!(out, "{}", batch.front_bleed_mm);
        for front in &batch.fronts {
            let _ = writeln!(out, "{}", front.display());
        }
        out.push('\n');
    }
    out
}

/// Read and parse a card list file without blocking the async runtime
pub async fn load_card_list(path: impl AsRef<Path>) -> Result<Vec<CardBatch>> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    tokio::task::spawn_blocking(move || parse_card_list(&text)).await?
}
