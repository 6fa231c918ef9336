pub mod canvas;
pub mod cardlist;
pub mod compose;
pub mod generate;
pub mod graphics;
mod layout;
mod options;
mod types;

pub use canvas::{mm_to_px, px_to_mm, Canvas, LineStyle, PdfCanvas};
pub use cardlist::{load_card_list, parse_card_list, write_card_list, CardBatch};
pub use compose::{CardPair, PageComposer};
pub use generate::{
    adjust_image, adjust_image_file, compose_pdf, compose_sync, ComposeRequest, ComposeSummary,
    ImageAdjustment, RotationMode,
};
pub use graphics::{AspectRotation, ImageTransform, PhysicalImage};
pub use layout::{SheetLayout, SLOTS_PER_PAGE};
pub use options::ComposerOptions;
pub use types::{CardPressError, FeedDirection, PageSize, Result, RotateDirection};
