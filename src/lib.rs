//! Bindery - lay out illustrated books and render them two ways.
//!
//! A book is laid out once per page into a [`render::RenderPlan`]; the terminal
//! preview and the PDF print interpreter both draw from that plan, so they agree
//! on layout, pagination and style by construction.

pub mod cli;
pub mod commands;
pub mod config;
pub mod export;
pub mod models;
pub mod preview;
pub mod print;
pub mod render;
#[cfg(feature = "server")]
pub mod server;

/// Library-level error type for Bindery operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Kdl(#[from] kdl::KdlError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Rejected book data; reported to callers as a 400-class error
    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version conflict: expected version {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("Asset {uri} could not be resolved: {reason}")]
    Asset { uri: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors caused by the caller's data rather than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::InvalidInput(_) | Error::Json(_)
        )
    }
}

/// Result type alias for Bindery operations.
pub type Result<T> = std::result::Result<T, Error>;
