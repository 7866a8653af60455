//! Configuration for Bindery.
//!
//! Settings live in KDL files at two levels:
//!
//! - Project: `./bindery.kdl`, or the file passed with `--config`
//! - System: `~/.config/bindery/config.kdl` (`$BINDERY_CONFIG_DIR/config.kdl` when set)
//!
//! Keys cover page geometry (`dimensions`, `margin-mm`, font sizes,
//! `line-height`), export behaviour (`export-parallel`, `isolate-page-failures`,
//! `metadata-log`), the `theme-catalog` file, and `serve-host` / `serve-port` /
//! `preview-zoom` / `output-format` for the CLI.
//!
//! ## Precedence
//!
//! CLI flag > project config > system config > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_DIR_ENV, DEFAULT_HOST, DEFAULT_PORT, PROJECT_CONFIG_FILE, Resolved, ResolvedConfig,
    ValueSource, resolve_config, resolve_layers, system_config_path,
};
pub use schema::{BinderyConfig, OutputFormat};
