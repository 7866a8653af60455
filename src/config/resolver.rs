//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Project config (`./bindery.kdl`, or the file named by `--config`)
//! 3. System config (`<config_dir>/bindery/config.kdl`)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{BinderyConfig, OutputFormat};
use crate::export::ExportOptions;
use crate::models::Dimensions;
use crate::render::LayoutSettings;
use crate::{Error, Result};

/// Environment variable that replaces the system config directory.
pub const CONFIG_DIR_ENV: &str = "BINDERY_CONFIG_DIR";

/// File name of the project-level config.
pub const PROJECT_CONFIG_FILE: &str = "bindery.kdl";

/// Default port for `bindery serve`.
pub const DEFAULT_PORT: u16 = 3030;

/// Default bind address for `bindery serve`.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Value from CLI flag
    #[serde(rename = "cli")]
    CliFlag,
    /// Value from the project config file
    Project,
    /// Value from the system config file
    System,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Project => write!(f, "project"),
            ValueSource::System => write!(f, "system"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub dimensions: Resolved<Dimensions>,
    pub margin_mm: Resolved<f64>,
    pub body_font_size: Resolved<f64>,
    pub title_font_size: Resolved<f64>,
    pub line_height: Resolved<f64>,
    pub export_parallel: Resolved<bool>,
    pub isolate_page_failures: Resolved<bool>,
    pub metadata_log: Option<Resolved<PathBuf>>,
    pub theme_catalog: Option<Resolved<PathBuf>>,
    pub serve_host: Resolved<String>,
    pub serve_port: Resolved<u16>,
    pub preview_zoom: Resolved<u16>,
    pub output_format: Resolved<OutputFormat>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let layout = LayoutSettings::default();
        let d = ValueSource::Default;
        Self {
            dimensions: Resolved::new(Dimensions::default(), d.clone()),
            margin_mm: Resolved::new(layout.margin_mm, d.clone()),
            body_font_size: Resolved::new(layout.body_font_size_pt, d.clone()),
            title_font_size: Resolved::new(layout.title_font_size_pt, d.clone()),
            line_height: Resolved::new(layout.line_height, d.clone()),
            export_parallel: Resolved::new(false, d.clone()),
            isolate_page_failures: Resolved::new(false, d.clone()),
            metadata_log: None,
            theme_catalog: None,
            serve_host: Resolved::new(DEFAULT_HOST.to_string(), d.clone()),
            serve_port: Resolved::new(DEFAULT_PORT, d.clone()),
            preview_zoom: Resolved::new(100, d.clone()),
            output_format: Resolved::new(OutputFormat::Json, d),
        }
    }
}

impl ResolvedConfig {
    /// Layout settings with the configured geometry and sizes.
    pub fn layout_settings(&self) -> LayoutSettings {
        LayoutSettings {
            margin_mm: self.margin_mm.value,
            body_font_size_pt: self.body_font_size.value,
            title_font_size_pt: self.title_font_size.value,
            line_height: self.line_height.value,
            ..LayoutSettings::default()
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            parallel: self.export_parallel.value,
            isolate_page_failures: self.isolate_page_failures.value,
        }
    }

    pub fn theme_catalog(&self) -> Option<&Path> {
        self.theme_catalog.as_ref().map(|r| r.value.as_path())
    }

    pub fn metadata_log(&self) -> Option<&Path> {
        self.metadata_log.as_ref().map(|r| r.value.as_path())
    }

    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }
}

/// Path of the system config file, if a config directory exists.
pub fn system_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir).join("config.kdl"));
    }
    dirs::config_dir().map(|dir| dir.join("bindery").join("config.kdl"))
}

fn pick<T: Clone>(
    cli: &Option<T>,
    project: &Option<T>,
    system: &Option<T>,
) -> Option<Resolved<T>> {
    if let Some(value) = cli {
        Some(Resolved::new(value.clone(), ValueSource::CliFlag))
    } else if let Some(value) = project {
        Some(Resolved::new(value.clone(), ValueSource::Project))
    } else {
        system
            .as_ref()
            .map(|value| Resolved::new(value.clone(), ValueSource::System))
    }
}

/// Resolve configuration with full precedence chain.
///
/// `project` is the project config path (missing files are treated as empty);
/// `overrides` holds the values given as CLI flags.
pub fn resolve_config(project: &Path, overrides: &BinderyConfig) -> Result<ResolvedConfig> {
    overrides
        .validate()
        .map_err(|msg| Error::Config(format!("command line: {}", msg)))?;

    let system = match system_config_path() {
        Some(path) => BinderyConfig::load(&path)?,
        None => BinderyConfig::new(),
    };
    let project = BinderyConfig::load(project)?;
    Ok(resolve_layers(overrides, &project, &system))
}

/// Merge three already-loaded layers.
pub fn resolve_layers(
    cli: &BinderyConfig,
    project: &BinderyConfig,
    system: &BinderyConfig,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    macro_rules! layer {
        ($field:ident) => {
            if let Some(resolved) = pick(&cli.$field, &project.$field, &system.$field) {
                result.$field = resolved;
            }
        };
    }

    layer!(dimensions);
    layer!(margin_mm);
    layer!(body_font_size);
    layer!(title_font_size);
    layer!(line_height);
    layer!(export_parallel);
    layer!(isolate_page_failures);
    layer!(serve_host);
    layer!(serve_port);
    layer!(preview_zoom);
    layer!(output_format);
    result.metadata_log = pick(&cli.metadata_log, &project.metadata_log, &system.metadata_log);
    result.theme_catalog = pick(&cli.theme_catalog, &project.theme_catalog, &system.theme_catalog);

    result
}
