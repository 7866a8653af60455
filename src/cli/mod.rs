//! CLI argument definitions for Bindery.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{BinderyConfig, OutputFormat};
use crate::models::Dimensions;

/// Bindery - lay out illustrated books for the terminal and for print.
///
/// Start with `bindery preview book.json`, then `bindery export book.json`.
#[derive(Parser, Debug)]
#[command(name = "bindery")]
#[command(author, version, about = "Lay out illustrated books and render them to the terminal or PDF", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Project config file (default: ./bindery.kdl)
    #[arg(long = "config", global = true, env = "BINDERY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub layout: LayoutArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Page geometry flags shared by every command
#[derive(Args, Debug, Default, Clone)]
pub struct LayoutArgs {
    /// Trim size for books that do not set one (A4, Letter, 6x9, 8.5x11, 5x8, 7x10)
    #[arg(long, global = true, value_parser = parse_dimensions)]
    pub dimensions: Option<Dimensions>,

    /// Page margin in millimetres
    #[arg(long = "margin", global = true)]
    pub margin_mm: Option<f64>,

    /// Theme catalog JSON file
    #[arg(long = "themes", global = true)]
    pub theme_catalog: Option<PathBuf>,
}

fn parse_dimensions(s: &str) -> Result<Dimensions, String> {
    Dimensions::parse(s).ok_or_else(|| format!("unknown dimensions '{}'", s))
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a book to PDF
    Export {
        /// Book JSON file
        book: PathBuf,

        /// Output file (default: <sanitized title>.pdf in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Owner recorded in the export metadata
        #[arg(long)]
        owner: Option<String>,

        /// Story id recorded in the export metadata
        #[arg(long)]
        story_id: Option<String>,

        /// Build page plans on worker threads
        #[arg(long)]
        parallel: bool,

        /// Print placeholders for images that cannot be loaded
        #[arg(long)]
        isolate: bool,

        /// Append export records to this JSONL file
        #[arg(long)]
        metadata_log: Option<PathBuf>,
    },

    /// Print the render plan of a book as JSON
    Plan {
        /// Book JSON file
        book: PathBuf,

        /// Only this page number
        #[arg(long)]
        page: Option<u32>,
    },

    /// Preview a book in the terminal
    Preview {
        /// Book JSON file
        book: PathBuf,

        /// Start at this page number
        #[arg(long)]
        page: Option<u32>,

        /// Zoom percentage (25-200)
        #[arg(long, value_parser = clap::value_parser!(u16).range(25..=200))]
        zoom: Option<u16>,

        /// Start in two-page spread mode
        #[arg(long)]
        spread: bool,

        /// Print the visible pages as text and exit instead of opening the viewer
        #[arg(long)]
        dump: bool,
    },

    /// Serve the HTTP API
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on (default: 3030)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host address to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved configuration and where each value came from
    Show,

    /// Print the path of each config file
    Path,
}

impl Cli {
    /// Config values given as flags.
    pub fn overrides(&self) -> BinderyConfig {
        let mut overrides = BinderyConfig {
            dimensions: self.layout.dimensions,
            margin_mm: self.layout.margin_mm,
            theme_catalog: self.layout.theme_catalog.clone(),
            ..BinderyConfig::default()
        };
        if self.human_readable {
            overrides.output_format = Some(OutputFormat::Human);
        }

        match &self.command {
            Commands::Export {
                parallel,
                isolate,
                metadata_log,
                ..
            } => {
                // boolean flags only override when set
                overrides.export_parallel = parallel.then_some(true);
                overrides.isolate_page_failures = isolate.then_some(true);
                overrides.metadata_log = metadata_log.clone();
            }
            Commands::Preview { zoom, .. } => overrides.preview_zoom = *zoom,
            #[cfg(feature = "server")]
            Commands::Serve { port, host } => {
                overrides.serve_port = *port;
                overrides.serve_host = host.clone();
            }
            _ => {}
        }
        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_flags_become_overrides() {
        let cli = Cli::parse_from([
            "bindery",
            "--margin",
            "12",
            "export",
            "book.json",
            "--parallel",
            "--dimensions",
            "6x9",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.margin_mm, Some(12.0));
        assert_eq!(overrides.dimensions, Some(Dimensions::Trade6x9));
        assert_eq!(overrides.export_parallel, Some(true));
        assert_eq!(overrides.isolate_page_failures, None);
    }

    #[test]
    fn test_human_flag_sets_output_format() {
        let cli = Cli::parse_from(["bindery", "-H", "config", "show"]);
        assert_eq!(cli.overrides().output_format, Some(OutputFormat::Human));
        let cli = Cli::parse_from(["bindery", "config", "show"]);
        assert_eq!(cli.overrides().output_format, None);
    }

    #[test]
    fn test_zoom_range_is_enforced() {
        assert!(Cli::try_parse_from(["bindery", "preview", "b.json", "--zoom", "300"]).is_err());
        let cli = Cli::try_parse_from(["bindery", "preview", "b.json", "--zoom", "150"]).unwrap();
        assert_eq!(cli.overrides().preview_zoom, Some(150));
    }

    #[test]
    fn test_unknown_dimensions_rejected() {
        assert!(Cli::try_parse_from(["bindery", "--dimensions", "B7", "plan", "b.json"]).is_err());
        assert!(Cli::try_parse_from(["bindery", "--dimensions", "A5", "plan", "b.json"]).is_err());
    }

    #[test]
    fn test_listed_dimensions_parse() {
        for name in ["A4", "Letter", "6x9", "8.5x11", "5x8", "7x10"] {
            let cli = Cli::try_parse_from(["bindery", "--dimensions", name, "plan", "b.json"]).unwrap();
            assert_eq!(cli.overrides().dimensions.map(|d| d.as_str()), Some(name));
        }
    }
}
