//! Command implementations for the `bindery` binary.
//!
//! Each command returns a result value that can be printed as JSON or as
//! human-readable text.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::config::{PROJECT_CONFIG_FILE, ResolvedConfig, system_config_path};
use crate::export::{ExportArtifact, Exporter, JsonlMetadataStore};
use crate::models::{Book, BookInput, ThemeCatalog};
use crate::preview::{PreviewSession, ViewMode};
use crate::print::FileAssetResolver;
use crate::render::{LayoutEngine, PlannedPage, RenderedPage};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

/// Read a book record from a JSON file.
pub fn load_book_input(path: &Path) -> Result<BookInput> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&text)?)
}

/// Theme catalog named by the config, or an empty one.
pub fn load_catalog(config: &ResolvedConfig) -> Result<ThemeCatalog> {
    match config.theme_catalog() {
        Some(path) => ThemeCatalog::load(path),
        None => Ok(ThemeCatalog::new()),
    }
}

/// An exporter wired up from resolved config.
pub fn exporter(config: &ResolvedConfig, catalog: ThemeCatalog) -> Exporter {
    let mut exporter = Exporter::new(
        Arc::new(catalog),
        LayoutEngine::new(config.layout_settings()),
    )
    .with_options(config.export_options())
    .with_default_dimensions(config.dimensions.value);
    if let Some(path) = config.metadata_log() {
        exporter = exporter.with_metadata(Arc::new(JsonlMetadataStore::new(path)));
    }
    exporter
}

fn base_dir(book_path: &Path) -> PathBuf {
    book_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

// === export ===

#[derive(Debug, Serialize)]
pub struct ExportResult {
    pub path: PathBuf,
    #[serde(flatten)]
    pub artifact: ExportArtifact,
}

impl Output for ExportResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Exported {} pages to {} ({} bytes)",
            self.artifact.pages.len(),
            self.path.display(),
            self.artifact.content_length
        )];
        for page in &self.artifact.pages {
            let mut line = format!(
                "  page {:>3}  {:<12} {} lines, {} images",
                page.page_number, page.variant.as_str(), page.lines, page.images
            );
            if !page.missing_images.is_empty() {
                line.push_str(&format!(", {} missing", page.missing_images.len()));
            }
            lines.push(line);
        }
        lines.push(format!("  sha256 {}", self.artifact.sha256));
        lines.join("\n")
    }
}

/// Export a book file to PDF.
pub fn export(
    book_path: &Path,
    output: Option<&Path>,
    owner: Option<&str>,
    story_id: Option<&str>,
    config: &ResolvedConfig,
) -> Result<ExportResult> {
    let input = load_book_input(book_path)?;
    let exporter = exporter(config, load_catalog(config)?)
        .with_resolver(Arc::new(FileAssetResolver::with_base_dir(base_dir(book_path))));
    let artifact = exporter.export(input, owner, story_id)?;

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(&artifact.filename),
    };
    std::fs::write(&path, &artifact.bytes)?;
    Ok(ExportResult { path, artifact })
}

// === plan ===

#[derive(Debug, Serialize)]
pub struct PlanResult {
    pub book_id: String,
    pub title: String,
    pub pages: Vec<PlannedPage>,
}

impl Output for PlanResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("{} ({} pages)", self.title, self.pages.len())];
        for planned in &self.pages {
            let plan = &planned.plan;
            lines.push(format!(
                "  page {:>3}  {:<7} {:<12} {:.0}x{:.0} mm  {} lines{}",
                plan.page_number,
                plan.page_type.as_str(),
                plan.variant.as_str(),
                plan.page.width_mm,
                plan.page.height_mm,
                plan.lines().len(),
                if plan.truncated() { " (truncated)" } else { "" }
            ));
        }
        lines.join("\n")
    }
}

fn load_book(exporter: &Exporter, book_path: &Path) -> Result<Book> {
    exporter.book_from_input(load_book_input(book_path)?)
}

/// Lay out a book file without printing it.
pub fn plan(book_path: &Path, page: Option<u32>, config: &ResolvedConfig) -> Result<PlanResult> {
    let exporter = exporter(config, load_catalog(config)?);
    let book = load_book(&exporter, book_path)?;
    let mut pages = exporter.plan(&book)?;
    if let Some(number) = page {
        pages.retain(|p| p.plan.page_number == number);
        if pages.is_empty() {
            return Err(Error::NotFound(format!("page {}", number)));
        }
    }
    Ok(PlanResult {
        book_id: book.id,
        title: book.title,
        pages,
    })
}

// === preview ===

/// Build a preview session for a book file.
pub fn preview_session(
    book_path: &Path,
    page: Option<u32>,
    spread: bool,
    config: &ResolvedConfig,
) -> Result<PreviewSession> {
    let exporter = exporter(config, load_catalog(config)?);
    let book = load_book(&exporter, book_path)?;
    let mut session = PreviewSession::new(
        Arc::new(book),
        Arc::clone(exporter.catalog()),
        *exporter.engine(),
    )
    .with_zoom(config.preview_zoom.value);

    if spread {
        session.apply(crate::preview::PreviewAction::ToggleSpread);
    }
    if let Some(number) = page {
        session.apply(crate::preview::PreviewAction::GoTo(number));
    }
    Ok(session)
}

#[derive(Debug, Serialize)]
pub struct DumpedPage {
    pub page_number: u32,
    pub text: String,
}

/// Text dump of the pages visible in a session.
#[derive(Debug, Serialize)]
pub struct PreviewDump {
    pub zoom: u16,
    pub spread: bool,
    pub pages: Vec<DumpedPage>,
    pub trace: Vec<RenderedPage>,
}

impl Output for PreviewDump {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        self.pages
            .iter()
            .map(|p| format!("--- page {} ---\n{}", p.page_number, p.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Rasterise the visible pages of a session.
pub fn preview_dump(session: &PreviewSession) -> Result<PreviewDump> {
    use crate::render::Interpreter;

    let canvas = session.render()?;
    Ok(PreviewDump {
        zoom: canvas.zoom(),
        spread: session.mode() == ViewMode::Spread,
        pages: canvas
            .pages()
            .iter()
            .map(|raster| DumpedPage {
                page_number: raster.page_number,
                text: raster.to_text(),
            })
            .collect(),
        trace: canvas.trace().to_vec(),
    })
}

// === config ===

#[derive(Debug, Serialize)]
pub struct ConfigShow {
    #[serde(flatten)]
    pub config: ResolvedConfig,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        json(&self.config)
    }

    fn to_human(&self) -> String {
        let c = &self.config;
        let mut lines = vec![
            format!("dimensions            = {} ({})", c.dimensions.value, c.dimensions.source),
            format!("margin-mm             = {} ({})", c.margin_mm.value, c.margin_mm.source),
            format!("body-font-size        = {} ({})", c.body_font_size.value, c.body_font_size.source),
            format!("title-font-size       = {} ({})", c.title_font_size.value, c.title_font_size.source),
            format!("line-height           = {} ({})", c.line_height.value, c.line_height.source),
            format!("export-parallel       = {} ({})", c.export_parallel.value, c.export_parallel.source),
            format!(
                "isolate-page-failures = {} ({})",
                c.isolate_page_failures.value, c.isolate_page_failures.source
            ),
            format!("serve-host            = {} ({})", c.serve_host.value, c.serve_host.source),
            format!("serve-port            = {} ({})", c.serve_port.value, c.serve_port.source),
            format!("preview-zoom          = {} ({})", c.preview_zoom.value, c.preview_zoom.source),
            format!(
                "output-format         = {} ({})",
                c.output_format.value.as_str(),
                c.output_format.source
            ),
        ];
        if let Some(r) = &c.theme_catalog {
            lines.push(format!("theme-catalog         = {} ({})", r.value.display(), r.source));
        }
        if let Some(r) = &c.metadata_log {
            lines.push(format!("metadata-log          = {} ({})", r.value.display(), r.source));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigPaths {
    pub project: PathBuf,
    pub project_exists: bool,
    pub system: Option<PathBuf>,
    pub system_exists: bool,
}

impl Output for ConfigPaths {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mark = |exists: bool| if exists { "" } else { " (missing)" };
        let system = match &self.system {
            Some(path) => format!("{}{}", path.display(), mark(self.system_exists)),
            None => "none".to_string(),
        };
        format!(
            "project: {}{}\nsystem:  {}",
            self.project.display(),
            mark(self.project_exists),
            system
        )
    }
}

/// Project config path: the explicit one or `./bindery.kdl`.
pub fn project_config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE))
}

pub fn config_paths(explicit: Option<&Path>) -> ConfigPaths {
    let project = project_config_path(explicit);
    let system = system_config_path();
    ConfigPaths {
        project_exists: project.exists(),
        system_exists: system.as_ref().is_some_and(|p| p.exists()),
        project,
        system,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_book(dir: &Path) -> PathBuf {
        let path = dir.join("book.json");
        let book = serde_json::json!({
            "title": "Dump Test",
            "author_name": "Ada",
            "dimensions": "5x8",
            "pages": [
                { "page_type": "cover" },
                { "page_type": "content", "content": "Hello there" }
            ]
        });
        std::fs::write(&path, book.to_string()).unwrap();
        path
    }

    #[test]
    fn test_plan_single_page() {
        let dir = TempDir::new().unwrap();
        let book = write_book(dir.path());
        let result = plan(&book, Some(2), &ResolvedConfig::default()).unwrap();
        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.pages[0].plan.page_number, 2);
        assert!(result.to_human().contains("127x203 mm"));
        assert!(matches!(
            plan(&book, Some(9), &ResolvedConfig::default()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_preview_dump_starts_at_page() {
        let dir = TempDir::new().unwrap();
        let book = write_book(dir.path());
        let session = preview_session(&book, Some(2), false, &ResolvedConfig::default()).unwrap();
        let dump = preview_dump(&session).unwrap();
        assert_eq!(dump.pages.len(), 1);
        assert_eq!(dump.pages[0].page_number, 2);
        assert!(dump.pages[0].text.contains("Hello there"));
    }

    #[test]
    fn test_export_writes_file() {
        let dir = TempDir::new().unwrap();
        let book = write_book(dir.path());
        let out = dir.path().join("out.pdf");
        let result = export(&book, Some(&out), None, None, &ResolvedConfig::default()).unwrap();
        assert_eq!(result.artifact.filename, "dump_test.pdf");
        assert_eq!(std::fs::read(&out).unwrap().len(), result.artifact.content_length);
        assert!(result.to_human().starts_with("Exported 2 pages"));
    }

    #[test]
    fn test_missing_book_file_is_input_error() {
        let err = load_book_input(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.is_client_error());
    }
}
