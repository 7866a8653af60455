//! Print interpreter: the display list rendered as a PDF document.

pub mod assets;
pub mod pdf;

pub use assets::{AssetResolver, FileAssetResolver, ResolvedImage};
pub use pdf::{PageSummary, PdfPrinter, PrintDocument, count_pages};
