//! Bindery CLI - lay out illustrated books and render them to the terminal or PDF.

use bindery::cli::{Cli, Commands, ConfigCommands};
use bindery::commands::{self, Output};
use bindery::config::{OutputFormat, resolve_config};
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter (e.g. `bindery=debug`).
const LOG_ENV: &str = "BINDERY_LOG";

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;
    let interactive = matches!(cli.command, Commands::Preview { dump: false, .. });
    let _log_guard = init_logging(cli.verbose, interactive);

    if let Err(e) = run(cli) {
        tracing::debug!(error = ?e, "command failed");
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

fn filter(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("bindery=info"),
        _ => EnvFilter::new("bindery=debug"),
    }
}

/// Log to stderr, or to a file while the interactive preview owns the terminal.
#[cfg(feature = "preview")]
fn init_logging(
    verbose: u8,
    interactive: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    if interactive {
        let dir = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("bindery")
            .join("logs");
        if std::fs::create_dir_all(&dir).is_ok() {
            let appender = tracing_appender::rolling::never(&dir, "preview.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter(verbose))
                .with_writer(writer)
                .with_ansi(false)
                .init();
            return Some(guard);
        }
        // no log directory: stay quiet rather than draw over the viewer
        return None;
    }
    init_stderr(verbose);
    None
}

#[cfg(not(feature = "preview"))]
fn init_logging(verbose: u8, _interactive: bool) -> Option<()> {
    init_stderr(verbose);
    None
}

fn init_stderr(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn run(cli: Cli) -> Result<(), bindery::Error> {
    let project = commands::project_config_path(cli.config.as_deref());

    if let Commands::Config {
        command: ConfigCommands::Path,
    } = &cli.command
    {
        output(&commands::config_paths(cli.config.as_deref()), cli.human_readable);
        return Ok(());
    }

    let config = resolve_config(&project, &cli.overrides())?;
    let human = *config.output_format() == OutputFormat::Human;

    match cli.command {
        Commands::Export {
            book,
            output: out,
            owner,
            story_id,
            ..
        } => {
            let result = commands::export(
                &book,
                out.as_deref(),
                owner.as_deref(),
                story_id.as_deref(),
                &config,
            )?;
            output(&result, human);
        }
        Commands::Plan { book, page } => {
            output(&commands::plan(&book, page, &config)?, human);
        }
        Commands::Preview {
            book,
            page,
            spread,
            dump,
            ..
        } => {
            let session = commands::preview_session(&book, page, spread, &config)?;
            if dump {
                output(&commands::preview_dump(&session)?, human);
            } else {
                run_preview(session)?;
            }
        }
        #[cfg(feature = "server")]
        Commands::Serve { .. } => run_server(&config)?,
        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::ConfigShow { config }, human),
            ConfigCommands::Path => {}
        },
    }
    Ok(())
}

#[cfg(feature = "preview")]
fn run_preview(session: bindery::preview::PreviewSession) -> Result<(), bindery::Error> {
    bindery::preview::run_preview(session)
}

#[cfg(not(feature = "preview"))]
fn run_preview(_session: bindery::preview::PreviewSession) -> Result<(), bindery::Error> {
    Err(bindery::Error::Other(
        "built without the preview feature; use --dump".to_string(),
    ))
}

/// Run the HTTP API server
#[cfg(feature = "server")]
fn run_server(config: &bindery::config::ResolvedConfig) -> Result<(), bindery::Error> {
    use bindery::export::MemoryMetadataStore;
    use bindery::server::{AppState, start_server};
    use std::sync::Arc;

    let mut exporter = commands::exporter(config, commands::load_catalog(config)?);
    if config.metadata_log().is_none() {
        exporter = exporter.with_metadata(Arc::new(MemoryMetadataStore::new()));
    }
    let state = AppState::new(exporter);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| bindery::Error::Other(format!("Failed to create runtime: {}", e)))?
        .block_on(start_server(
            state,
            &config.serve_host.value,
            config.serve_port.value,
        ))
}
