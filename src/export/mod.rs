//! Export pipeline: book input in, finished PDF artifact out.
//!
//! An export validates the input, takes a snapshot, plans every page, prints
//! the plans in page order into one document and then records the export in
//! the metadata store. Recording is best effort.

pub mod metadata;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};

pub use metadata::{
    ExportRecord, JsonlMetadataStore, MemoryMetadataStore, MetadataStore, STATUS_EXPORTED,
};

use crate::models::{Book, BookInput, Dimensions, ThemeCatalog};
use crate::print::{AssetResolver, FileAssetResolver, PageSummary, PdfPrinter};
use crate::render::{self, LayoutEngine, PlannedPage, RenderedPage};
use crate::{Error, Result};

/// Content type of every artifact.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const MAX_FILENAME_LEN: usize = 100;

/// Behaviour switches for an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportOptions {
    /// Build page plans on worker threads
    pub parallel: bool,
    /// Print placeholders for unresolvable images instead of failing
    pub isolate_page_failures: bool,
}

/// A finished export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportArtifact {
    pub book_id: String,
    pub filename: String,
    pub content_type: &'static str,
    pub content_length: usize,
    /// Hex SHA-256 of `bytes`
    pub sha256: String,
    pub pages: Vec<PageSummary>,
    #[serde(skip)]
    pub trace: Vec<RenderedPage>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Turn a title into a safe file stem.
///
/// Keeps ASCII letters, digits, `-`, `_` and whitespace; whitespace runs become
/// one `_`, `_` runs collapse, leading and trailing `_` go, the result is cut at
/// 100 characters and lowercased. An empty result becomes `book`.
pub fn sanitize_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for ch in title.chars() {
        let mapped = if ch.is_ascii_alphanumeric() || ch == '-' {
            ch.to_ascii_lowercase()
        } else if ch == '_' || ch.is_whitespace() {
            '_'
        } else {
            continue;
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }

    let trimmed = out.trim_matches('_');
    let mut stem: String = trimmed.chars().take(MAX_FILENAME_LEN).collect();
    // the cut may leave a trailing separator
    while stem.ends_with('_') {
        stem.pop();
    }
    if stem.is_empty() {
        "book".to_string()
    } else {
        stem
    }
}

/// Runs exports against a shared theme catalog.
#[derive(Clone)]
pub struct Exporter {
    catalog: Arc<ThemeCatalog>,
    engine: LayoutEngine,
    resolver: Arc<dyn AssetResolver>,
    metadata: Option<Arc<dyn MetadataStore>>,
    options: ExportOptions,
    default_dimensions: Dimensions,
}

impl Exporter {
    pub fn new(catalog: Arc<ThemeCatalog>, engine: LayoutEngine) -> Self {
        Self {
            catalog,
            engine,
            resolver: Arc::new(FileAssetResolver::new()),
            metadata: None,
            options: ExportOptions::default(),
            default_dimensions: Dimensions::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn AssetResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_metadata(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.metadata = Some(store);
        self
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Trim size for books that do not name one.
    pub fn with_default_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.default_dimensions = dimensions;
        self
    }

    pub fn catalog(&self) -> &Arc<ThemeCatalog> {
        &self.catalog
    }

    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    pub fn default_dimensions(&self) -> Dimensions {
        self.default_dimensions
    }

    /// Validate a wire record with this exporter's defaults applied.
    pub fn book_from_input(&self, mut input: BookInput) -> Result<Book> {
        if input.dimensions.as_deref().is_none_or(|d| d.trim().is_empty()) {
            input.dimensions = Some(self.default_dimensions.as_str().to_string());
        }
        Book::from_input(input)
    }

    /// Validate and export a book record.
    pub fn export(
        &self,
        input: BookInput,
        owner: Option<&str>,
        story_id: Option<&str>,
    ) -> Result<ExportArtifact> {
        let book = Arc::new(self.book_from_input(input)?);
        self.export_book(&book, owner, story_id)
    }

    /// Export an already validated snapshot.
    pub fn export_book(
        &self,
        book: &Arc<Book>,
        owner: Option<&str>,
        story_id: Option<&str>,
    ) -> Result<ExportArtifact> {
        if book.pages.is_empty() {
            return Err(Error::Validation(
                "Book must contain at least one page".to_string(),
            ));
        }
        let profile = book.profile();
        tracing::info!(
            book_id = %book.id,
            pages = book.pages.len(),
            dimensions = %book.dimensions,
            width_mm = profile.width_mm,
            height_mm = profile.height_mm,
            parallel = self.options.parallel,
            "exporting book"
        );

        let planned = self.plan(book)?;
        let mut printer = PdfPrinter::new(self.resolver.as_ref(), self.options.isolate_page_failures);
        render::draw_all(&mut printer, &planned)?;
        let document = printer.finish()?;

        let sha256 = format!("{:x}", Sha256::digest(&document.bytes));
        let artifact = ExportArtifact {
            book_id: book.id.clone(),
            filename: format!("{}.pdf", sanitize_filename(&book.title)),
            content_type: PDF_CONTENT_TYPE,
            content_length: document.bytes.len(),
            sha256,
            pages: document.pages,
            trace: document.trace,
            bytes: document.bytes,
        };

        self.record(book, &artifact, owner, story_id);
        tracing::info!(
            book_id = %book.id,
            filename = %artifact.filename,
            bytes = artifact.content_length,
            "export finished"
        );
        Ok(artifact)
    }

    /// Plan every page, in page order.
    pub fn plan(&self, book: &Book) -> Result<Vec<PlannedPage>> {
        if !self.options.parallel || book.pages.len() < 2 {
            return Ok(render::plan_book(book, &self.catalog, &self.engine));
        }

        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(book.pages.len());
        let chunk = book.pages.len().div_ceil(workers);
        let catalog: &ThemeCatalog = &self.catalog;
        let engine = &self.engine;

        let mut planned = std::thread::scope(|scope| {
            let handles: Vec<_> = book
                .pages
                .chunks(chunk)
                .map(|pages| {
                    scope.spawn(move || {
                        pages
                            .iter()
                            .map(|page| render::plan_page(page, book, catalog, engine))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            let mut all = Vec::with_capacity(book.pages.len());
            for handle in handles {
                let part = handle
                    .join()
                    .map_err(|_| Error::Other("page planning worker panicked".to_string()))?;
                all.extend(part);
            }
            Ok::<_, Error>(all)
        })?;

        planned.sort_by_key(|p| p.plan.page_number);
        Ok(planned)
    }

    fn record(&self, book: &Book, artifact: &ExportArtifact, owner: Option<&str>, story_id: Option<&str>) {
        let Some(store) = &self.metadata else {
            return;
        };
        let mut theme_ids: Vec<String> = Vec::new();
        let overrides = book.pages.iter().map(|p| p.theme_override.as_ref());
        for id in [book.theme_id.as_ref(), book.cover_theme_id.as_ref()]
            .into_iter()
            .chain(overrides)
            .flatten()
        {
            if !theme_ids.contains(id) {
                theme_ids.push(id.clone());
            }
        }
        let record = ExportRecord {
            id: uuid::Uuid::new_v4().to_string(),
            exported_at: Utc::now(),
            owner: owner.unwrap_or_default().to_string(),
            book_id: book.id.clone(),
            story_id: story_id.map(str::to_string),
            title: book.title.clone(),
            page_count: book.total_pages,
            theme_ids,
            status: STATUS_EXPORTED.to_string(),
            filename: artifact.filename.clone(),
            sha256: artifact.sha256.clone(),
        };
        if let Err(e) = store.upsert(&record) {
            tracing::warn!(
                book_id = %book.id,
                backend = store.backend_type(),
                error = %e,
                "failed to record export metadata"
            );
        }
    }
}
