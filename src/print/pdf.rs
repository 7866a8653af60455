//! PDF print interpreter.
//!
//! Writes one PDF page per planned page with `pdf-writer`. Page geometry comes
//! from the plan's dimension profile; millimetre coordinates from the top-left
//! are flipped into PDF points from the bottom-left. Text uses the standard
//! Type1 fonts, so nothing is embedded except images.

use std::collections::HashMap;
use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};
use serde::Serialize;

use super::assets::AssetResolver;
use crate::Result;
use crate::models::{PageLayout, mm_to_pt};
use crate::render::{FontClass, Interpreter, RenderCommand, RenderPlan, RenderedPage, Rgb};

const PLACEHOLDER_GREY: f32 = 0.85;

/// Type1 font resources, one per font class.
const FONTS: [(FontClass, &str); 3] = [
    (FontClass::Serif, "F1"),
    (FontClass::Sans, "F2"),
    (FontClass::Mono, "F3"),
];

fn font_resource(class: FontClass) -> &'static str {
    FONTS
        .iter()
        .find(|(c, _)| *c == class)
        .map(|(_, name)| *name)
        .unwrap_or("F1")
}

/// What was printed on one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub page_number: u32,
    pub variant: PageLayout,
    pub width_pt: f64,
    pub height_pt: f64,
    pub lines: usize,
    pub images: usize,
    /// Image URIs drawn as placeholders because they could not be resolved
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_images: Vec<String>,
}

/// A finished print document.
#[derive(Debug, Clone)]
pub struct PrintDocument {
    pub bytes: Vec<u8>,
    pub pages: Vec<PageSummary>,
    pub trace: Vec<RenderedPage>,
}

#[derive(Debug, Clone)]
struct EmbeddedImage {
    name: String,
    id: Ref,
}

/// Interpreter that appends pages to an in-memory PDF.
pub struct PdfPrinter<'a> {
    resolver: &'a dyn AssetResolver,
    isolate_failures: bool,
    pdf: Pdf,
    next_id: i32,
    catalog_id: Ref,
    pages_id: Ref,
    font_ids: Vec<(&'static str, Ref)>,
    page_ids: Vec<Ref>,
    /// Per-URI cache; `None` records a URI that failed to resolve
    images: HashMap<String, Option<EmbeddedImage>>,
    summaries: Vec<PageSummary>,
    trace: Vec<RenderedPage>,
}

impl<'a> PdfPrinter<'a> {
    /// Start a document. With `isolate_failures`, unresolvable images become
    /// grey placeholders instead of failing the page.
    pub fn new(resolver: &'a dyn AssetResolver, isolate_failures: bool) -> Self {
        let mut printer = Self {
            resolver,
            isolate_failures,
            pdf: Pdf::new(),
            next_id: 1,
            catalog_id: Ref::new(1),
            pages_id: Ref::new(1),
            font_ids: Vec::new(),
            page_ids: Vec::new(),
            images: HashMap::new(),
            summaries: Vec::new(),
            trace: Vec::new(),
        };
        printer.catalog_id = printer.alloc();
        printer.pages_id = printer.alloc();
        for (class, name) in FONTS {
            let id = printer.alloc();
            printer
                .pdf
                .type1_font(id)
                .base_font(Name(class.pdf_base_font().as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
            printer.font_ids.push((name, id));
        }
        printer
    }

    fn alloc(&mut self) -> Ref {
        let r = Ref::new(self.next_id);
        self.next_id += 1;
        r
    }

    /// Embed an image once per URI.
    fn image(&mut self, uri: &str) -> Result<Option<EmbeddedImage>> {
        if let Some(cached) = self.images.get(uri) {
            return Ok(cached.clone());
        }

        let resolved = match self.resolver.resolve(uri) {
            Ok(resolved) => resolved,
            Err(e) if self.isolate_failures => {
                tracing::warn!(uri, error = %e, "image unavailable, printing placeholder");
                self.images.insert(uri.to_string(), None);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let id = self.alloc();
        let name = format!("Im{}", self.images.values().flatten().count() + 1);
        let compressed = deflate(&resolved.rgb)?;
        let mut xobj = self.pdf.image_xobject(id, &compressed);
        xobj.filter(Filter::FlateDecode);
        xobj.width(resolved.width as i32);
        xobj.height(resolved.height as i32);
        xobj.color_space().device_rgb();
        xobj.bits_per_component(8);
        drop(xobj);

        tracing::debug!(uri, width = resolved.width, height = resolved.height, "embedded image");
        let embedded = EmbeddedImage { name, id };
        self.images.insert(uri.to_string(), Some(embedded.clone()));
        Ok(Some(embedded))
    }

    /// Write the page tree and return the document.
    pub fn finish(mut self) -> Result<PrintDocument> {
        self.pdf.catalog(self.catalog_id).pages(self.pages_id);
        self.pdf
            .pages(self.pages_id)
            .kids(self.page_ids.iter().copied())
            .count(self.page_ids.len() as i32);

        let bytes = self.pdf.finish();
        tracing::debug!(pages = self.page_ids.len(), bytes = bytes.len(), "finished pdf");
        Ok(PrintDocument {
            bytes,
            pages: self.summaries,
            trace: self.trace,
        })
    }

    /// Pages printed so far.
    pub fn summaries(&self) -> &[PageSummary] {
        &self.summaries
    }
}

impl Interpreter for PdfPrinter<'_> {
    fn draw_page(&mut self, plan: &RenderPlan, commands: &[RenderCommand]) -> Result<()> {
        let page_id = self.alloc();
        let content_id = self.alloc();
        let width_pt = plan.page.width_pt();
        let height_pt = plan.page.height_pt();
        // PDF y runs upwards from the bottom edge
        let flip = |y_mm: f64| (height_pt - mm_to_pt(y_mm)) as f32;

        let mut content = Content::new();
        let mut used_images: Vec<EmbeddedImage> = Vec::new();
        let mut trace = RenderedPage::new(plan);
        let mut summary = PageSummary {
            page_number: plan.page_number,
            variant: plan.variant,
            width_pt,
            height_pt,
            lines: 0,
            images: 0,
            missing_images: Vec::new(),
        };

        for command in commands {
            match command {
                RenderCommand::FillRect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    let (r, g, b) = Rgb::parse(color).unwrap_or(Rgb::WHITE).to_unit();
                    content.save_state();
                    content.set_fill_rgb(r, g, b);
                    content.rect(
                        mm_to_pt(*x) as f32,
                        flip(y + height),
                        mm_to_pt(*width) as f32,
                        mm_to_pt(*height) as f32,
                    );
                    content.fill_nonzero();
                    content.restore_state();
                }
                RenderCommand::Image {
                    uri,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let (x, y_bottom) = (mm_to_pt(*x) as f32, flip(y + height));
                    let (w, h) = (mm_to_pt(*width) as f32, mm_to_pt(*height) as f32);
                    match self.image(uri)? {
                        Some(embedded) => {
                            content.save_state();
                            content.transform([w, 0.0, 0.0, h, x, y_bottom]);
                            content.x_object(Name(embedded.name.as_bytes()));
                            content.restore_state();
                            if !used_images.iter().any(|i| i.id == embedded.id) {
                                used_images.push(embedded);
                            }
                        }
                        None => {
                            content.save_state();
                            content.set_fill_rgb(PLACEHOLDER_GREY, PLACEHOLDER_GREY, PLACEHOLDER_GREY);
                            content.rect(x, y_bottom, w, h);
                            content.fill_nonzero();
                            content.restore_state();
                            summary.missing_images.push(uri.clone());
                        }
                    }
                    summary.images += 1;
                }
                RenderCommand::Text {
                    x,
                    y,
                    text,
                    color,
                    font,
                    font_size_pt,
                    ..
                } => {
                    let (r, g, b) = Rgb::parse(color).unwrap_or(Rgb::BLACK).to_unit();
                    let encoded = win_ansi(text);
                    content.begin_text();
                    content.set_font(Name(font_resource(*font).as_bytes()), *font_size_pt as f32);
                    content.set_fill_rgb(r, g, b);
                    content.next_line(mm_to_pt(*x) as f32, flip(*y));
                    content.show(Str(&encoded));
                    content.end_text();
                    summary.lines += 1;
                }
            }
            trace.record(command);
        }

        let compressed = deflate(&content.finish())?;
        self.pdf
            .stream(content_id, &compressed)
            .filter(Filter::FlateDecode);

        let mut page = self.pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, width_pt as f32, height_pt as f32))
            .parent(self.pages_id)
            .contents(content_id);
        {
            let mut resources = page.resources();
            {
                let mut fonts = resources.fonts();
                for (name, id) in &self.font_ids {
                    fonts.pair(Name(name.as_bytes()), *id);
                }
            }
            if !used_images.is_empty() {
                let mut xobjects = resources.x_objects();
                for image in &used_images {
                    xobjects.pair(Name(image.name.as_bytes()), image.id);
                }
            }
        }
        drop(page);

        tracing::debug!(
            page_number = plan.page_number,
            variant = %plan.variant,
            lines = summary.lines,
            images = summary.images,
            "printed page"
        );
        self.page_ids.push(page_id);
        self.summaries.push(summary);
        self.trace.push(trace);
        Ok(())
    }

    fn trace(&self) -> &[RenderedPage] {
        &self.trace
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Encode text for a WinAnsiEncoding font. Characters outside the encoding
/// print as `?`.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

/// Number of page objects in a PDF produced by this printer.
pub fn count_pages(bytes: &[u8]) -> usize {
    let needle = b"/Type /Page";
    bytes
        .windows(needle.len() + 1)
        .filter(|w| w.starts_with(needle) && w[needle.len()] != b's')
        .count()
}
