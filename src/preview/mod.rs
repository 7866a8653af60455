//! Interactive preview.
//!
//! The preview is the second interpreter of the shared display list. The
//! session and the character canvas are always available (tests and the
//! `--dump` CLI mode use them); the terminal front end is behind the `preview`
//! feature.

pub mod canvas;
pub mod session;

#[cfg(feature = "preview")]
mod app;

pub use canvas::{Cell, PageCanvas, RasterPage};
pub use session::{PreviewAction, PreviewSession, ViewMode};

#[cfg(feature = "preview")]
pub use app::{action_for, run_preview};
