//! KDL schema for bindery.kdl.
//!
//! This module provides:
//! - The Rust struct representing the KDL schema
//! - Conversion to and from KDL documents
//! - Validation of value ranges

use std::path::{Path, PathBuf};

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

use crate::models::Dimensions;
use crate::{Error, Result};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings stored in bindery.kdl.
///
/// Every field is optional; unset fields fall through to the next
/// configuration layer.
///
/// # KDL Schema
///
/// ```kdl
/// dimensions "6x9"
/// margin-mm 18.0
/// body-font-size 11
/// title-font-size 22
/// line-height 1.5
/// export-parallel #true
/// isolate-page-failures #false
/// metadata-log "exports.jsonl"
/// theme-catalog "themes.json"
/// serve-host "127.0.0.1"
/// serve-port 3030
/// preview-zoom 75
/// output-format "human"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinderyConfig {
    /// Trim size used when a book does not name one
    pub dimensions: Option<Dimensions>,
    pub margin_mm: Option<f64>,
    pub body_font_size: Option<f64>,
    pub title_font_size: Option<f64>,
    /// Line height as a multiple of the font size
    pub line_height: Option<f64>,
    /// Plan pages on worker threads during export
    pub export_parallel: Option<bool>,
    /// Print placeholders for unresolvable images instead of failing
    pub isolate_page_failures: Option<bool>,
    /// JSONL file export records are appended to
    pub metadata_log: Option<PathBuf>,
    /// Theme catalog JSON file
    pub theme_catalog: Option<PathBuf>,
    pub serve_host: Option<String>,
    pub serve_port: Option<u16>,
    pub preview_zoom: Option<u16>,
    pub output_format: Option<OutputFormat>,
}

fn first_value<'a>(doc: &'a KdlDocument, key: &str) -> Option<&'a KdlValue> {
    doc.get(key)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn string(doc: &KdlDocument, key: &str) -> Option<String> {
    first_value(doc, key)
        .and_then(|v| v.as_string())
        .map(str::to_string)
}

/// Integers are accepted wherever a float is expected.
fn number(doc: &KdlDocument, key: &str) -> Option<f64> {
    first_value(doc, key).and_then(|v| match v {
        KdlValue::Float(f) => Some(*f),
        KdlValue::Integer(i) => Some(*i as f64),
        _ => None,
    })
}

fn integer<T: TryFrom<i128>>(doc: &KdlDocument, key: &str) -> Option<T> {
    first_value(doc, key)
        .and_then(|v| v.as_integer())
        .and_then(|i| T::try_from(i).ok())
}

fn boolean(doc: &KdlDocument, key: &str) -> Option<bool> {
    first_value(doc, key).and_then(|v| v.as_bool())
}

fn push(doc: &mut KdlDocument, key: &str, value: KdlValue) {
    let mut node = KdlNode::new(key);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

impl BinderyConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is out of range.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(margin) = self.margin_mm
            && !(0.0..=100.0).contains(&margin)
        {
            return Err(format!("margin-mm must be 0-100, got {}", margin));
        }
        for (key, size) in [
            ("body-font-size", self.body_font_size),
            ("title-font-size", self.title_font_size),
        ] {
            if let Some(size) = size
                && !(size > 0.0 && size <= 200.0)
            {
                return Err(format!("{} must be between 0 and 200, got {}", key, size));
            }
        }
        if let Some(line_height) = self.line_height
            && !(0.5..=4.0).contains(&line_height)
        {
            return Err(format!("line-height must be 0.5-4.0, got {}", line_height));
        }
        if self.serve_port == Some(0) {
            return Err("serve-port must not be 0".to_string());
        }
        if let Some(zoom) = self.preview_zoom
            && !(25..=200).contains(&zoom)
        {
            return Err(format!("preview-zoom must be 25-200, got {}", zoom));
        }
        Ok(())
    }

    /// Parse config from a KDL document. Values of the wrong type are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let dimensions = string(doc, "dimensions").and_then(|raw| {
            let parsed = Dimensions::parse(&raw);
            if parsed.is_none() {
                tracing::warn!(value = %raw, "ignoring unknown dimensions in config");
            }
            parsed
        });

        Self {
            dimensions,
            margin_mm: number(doc, "margin-mm"),
            body_font_size: number(doc, "body-font-size"),
            title_font_size: number(doc, "title-font-size"),
            line_height: number(doc, "line-height"),
            export_parallel: boolean(doc, "export-parallel"),
            isolate_page_failures: boolean(doc, "isolate-page-failures"),
            metadata_log: string(doc, "metadata-log").map(PathBuf::from),
            theme_catalog: string(doc, "theme-catalog").map(PathBuf::from),
            serve_host: string(doc, "serve-host"),
            serve_port: integer(doc, "serve-port"),
            preview_zoom: integer(doc, "preview-zoom"),
            output_format: string(doc, "output-format").and_then(|s| OutputFormat::parse(&s)),
        }
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(dimensions) = self.dimensions {
            push(&mut doc, "dimensions", KdlValue::String(dimensions.as_str().to_string()));
        }
        for (key, value) in [
            ("margin-mm", self.margin_mm),
            ("body-font-size", self.body_font_size),
            ("title-font-size", self.title_font_size),
            ("line-height", self.line_height),
        ] {
            if let Some(value) = value {
                push(&mut doc, key, KdlValue::Float(value));
            }
        }
        for (key, value) in [
            ("export-parallel", self.export_parallel),
            ("isolate-page-failures", self.isolate_page_failures),
        ] {
            if let Some(value) = value {
                push(&mut doc, key, KdlValue::Bool(value));
            }
        }
        for (key, value) in [
            ("metadata-log", &self.metadata_log),
            ("theme-catalog", &self.theme_catalog),
        ] {
            if let Some(path) = value {
                push(&mut doc, key, KdlValue::String(path.display().to_string()));
            }
        }
        if let Some(ref host) = self.serve_host {
            push(&mut doc, "serve-host", KdlValue::String(host.clone()));
        }
        if let Some(port) = self.serve_port {
            push(&mut doc, "serve-port", KdlValue::Integer(port as i128));
        }
        if let Some(zoom) = self.preview_zoom {
            push(&mut doc, "preview-zoom", KdlValue::Integer(zoom as i128));
        }
        if let Some(ref format) = self.output_format {
            push(&mut doc, "output-format", KdlValue::String(format.as_str().to_string()));
        }

        doc
    }

    /// Read and validate a config file. A missing file is an empty config.
    ///
    /// Relative paths inside the file are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        let doc: KdlDocument = text.parse()?;
        let mut config = Self::from_kdl(&doc);
        config
            .validate()
            .map_err(|msg| Error::Config(format!("{}: {}", path.display(), msg)))?;

        if let Some(base) = path.parent() {
            for field in [&mut config.metadata_log, &mut config.theme_catalog] {
                if let Some(p) = field
                    && p.is_relative()
                {
                    *p = base.join(&*p);
                }
            }
        }
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ==================== OutputFormat Tests ====================

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("HUMAN"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("invalid"), None);
    }

    // ==================== BinderyConfig Tests ====================

    #[test]
    fn test_config_from_kdl_empty() {
        let doc = KdlDocument::new();
        assert_eq!(BinderyConfig::from_kdl(&doc), BinderyConfig::default());
    }

    #[test]
    fn test_config_from_kdl_full() {
        let kdl = r#"
            dimensions "6x9"
            margin-mm 18.5
            body-font-size 11
            line-height 1.5
            export-parallel #true
            isolate-page-failures #false
            theme-catalog "themes.json"
            serve-port 8080
            preview-zoom 75
            output-format "human"
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let config = BinderyConfig::from_kdl(&doc);

        assert_eq!(config.dimensions, Some(Dimensions::Trade6x9));
        assert_eq!(config.margin_mm, Some(18.5));
        assert_eq!(config.body_font_size, Some(11.0));
        assert_eq!(config.line_height, Some(1.5));
        assert_eq!(config.export_parallel, Some(true));
        assert_eq!(config.isolate_page_failures, Some(false));
        assert_eq!(config.theme_catalog, Some(PathBuf::from("themes.json")));
        assert_eq!(config.serve_port, Some(8080));
        assert_eq!(config.preview_zoom, Some(75));
        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert_eq!(config.title_font_size, None);
    }

    #[test]
    fn test_config_ignores_wrong_types() {
        let doc: KdlDocument = r#"
            margin-mm "wide"
            serve-port 70000
            dimensions "tabloid"
        "#
        .parse()
        .unwrap();
        let config = BinderyConfig::from_kdl(&doc);
        assert_eq!(config.margin_mm, None);
        assert_eq!(config.serve_port, None);
        assert_eq!(config.dimensions, None);
    }

    #[test]
    fn test_config_to_kdl_roundtrip() {
        let config = BinderyConfig {
            dimensions: Some(Dimensions::Digest5x8),
            margin_mm: Some(15.0),
            export_parallel: Some(true),
            metadata_log: Some(PathBuf::from("/var/log/exports.jsonl")),
            serve_host: Some("0.0.0.0".to_string()),
            serve_port: Some(9000),
            preview_zoom: Some(150),
            output_format: Some(OutputFormat::Human),
            ..BinderyConfig::default()
        };
        let parsed = BinderyConfig::from_kdl(&config.to_kdl());
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_validate() {
        assert!(BinderyConfig::default().validate().is_ok());
        let bad = [
            BinderyConfig {
                margin_mm: Some(-1.0),
                ..Default::default()
            },
            BinderyConfig {
                body_font_size: Some(0.0),
                ..Default::default()
            },
            BinderyConfig {
                line_height: Some(9.0),
                ..Default::default()
            },
            BinderyConfig {
                preview_zoom: Some(10),
                ..Default::default()
            },
            BinderyConfig {
                serve_port: Some(0),
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{:?}", config);
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = BinderyConfig::load(&dir.path().join("bindery.kdl")).unwrap();
        assert_eq!(config, BinderyConfig::default());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bindery.kdl");
        std::fs::write(&path, "theme-catalog \"themes.json\"\nmetadata-log \"/abs/log.jsonl\"\n")
            .unwrap();
        let config = BinderyConfig::load(&path).unwrap();
        assert_eq!(config.theme_catalog, Some(dir.path().join("themes.json")));
        assert_eq!(config.metadata_log, Some(PathBuf::from("/abs/log.jsonl")));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bindery.kdl");
        std::fs::write(&path, "preview-zoom 500\n").unwrap();
        assert!(matches!(BinderyConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_rejects_bad_syntax() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bindery.kdl");
        std::fs::write(&path, "margin-mm {{{\n").unwrap();
        assert!(matches!(BinderyConfig::load(&path), Err(Error::Kdl(_))));
    }
}
