//! Image asset resolution.
//!
//! Pages carry images as opaque URIs. The print interpreter turns them into
//! pixels through an [`AssetResolver`]; only local files are resolvable here.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Decoded 8-bit RGB pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB triples
    pub rgb: Vec<u8>,
}

impl ResolvedImage {
    /// Decode any format the `image` crate is built with.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?.to_rgb8();
        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            rgb: decoded.into_raw(),
        })
    }
}

/// Turns an image URI into pixels.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, uri: &str) -> Result<ResolvedImage>;
}

/// Resolves `file://` URIs and plain filesystem paths.
///
/// Relative paths are taken relative to the base directory (usually the
/// directory holding the book file) when one is set.
#[derive(Debug, Clone, Default)]
pub struct FileAssetResolver {
    base_dir: Option<PathBuf>,
}

impl FileAssetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Map a URI to a local path without touching the filesystem.
    pub fn path_for(&self, uri: &str) -> Result<PathBuf> {
        let asset_error = |reason: &str| Error::Asset {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };

        let raw = if let Some(rest) = uri.strip_prefix("file://") {
            // file://localhost/path and file:///path name the same file
            rest.strip_prefix("localhost").unwrap_or(rest)
        } else if uri.contains("://") || uri.starts_with("data:") {
            return Err(asset_error("only local files can be resolved"));
        } else {
            uri
        };
        if raw.trim().is_empty() {
            return Err(asset_error("empty path"));
        }

        let path = Path::new(raw);
        Ok(match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        })
    }
}

impl AssetResolver for FileAssetResolver {
    fn resolve(&self, uri: &str) -> Result<ResolvedImage> {
        let path = self.path_for(uri)?;
        let bytes = std::fs::read(&path).map_err(|e| Error::Asset {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        ResolvedImage::decode(&bytes).map_err(|e| Error::Asset {
            uri: uri.to_string(),
            reason: e.to_string(),
        })
    }
}
