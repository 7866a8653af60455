//! Layout engine.
//!
//! Computes a [`RenderPlan`] for one page from the page, its physical size and
//! its resolved style. Layout is a pure function: the same inputs always give
//! the same plan, which is what lets the preview and the printed document agree.
//!
//! Geometry uses millimetres from the top-left corner of the page. Every variant
//! works inside the content box (page minus margins); content pages additionally
//! get a page number in the bottom margin, on the left for even numbers and on the
//! right for odd numbers.

use serde::{Deserialize, Serialize};

use super::flow::{self, FontClass};
use super::plan::{BoxMm, ImageSlot, RenderPlan, TextAlign, TextBlock, TextRole};
use super::theme::EffectiveStyle;
use crate::models::{Colophon, DimensionProfile, Page, PageKind, PageLayout, pt_to_mm};

/// Tunable geometry and type sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSettings {
    pub margin_mm: f64,
    pub body_font_size_pt: f64,
    pub title_font_size_pt: f64,
    pub subtitle_font_size_pt: f64,
    pub author_font_size_pt: f64,
    pub info_font_size_pt: f64,
    pub page_number_font_size_pt: f64,
    /// Line height as a multiple of the font size
    pub line_height: f64,
    /// Space between columns and halves
    pub gap_mm: f64,
    /// Height of the image band in image-top / image-bottom layouts
    pub image_band_mm: f64,
    /// Baseline spacing of the end-page info block
    pub info_line_spacing_mm: f64,
    pub page_number_box_width_mm: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            margin_mm: 20.0,
            body_font_size_pt: 12.0,
            title_font_size_pt: 24.0,
            subtitle_font_size_pt: 16.0,
            author_font_size_pt: 14.0,
            info_font_size_pt: 9.0,
            page_number_font_size_pt: 10.0,
            line_height: 1.4,
            gap_mm: 8.0,
            image_band_mm: 48.0,
            info_line_spacing_mm: 6.0,
            page_number_box_width_mm: 20.0,
        }
    }
}

impl LayoutSettings {
    /// Baseline-to-baseline distance for a font size.
    pub fn line_height_mm(&self, font_size_pt: f64) -> f64 {
        pt_to_mm(font_size_pt) * self.line_height
    }
}

/// Lays out pages with fixed settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutEngine {
    settings: LayoutSettings,
}

impl LayoutEngine {
    pub fn new(settings: LayoutSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    /// Lay out one page.
    pub fn layout(
        &self,
        page: &Page,
        profile: &DimensionProfile,
        style: &EffectiveStyle,
    ) -> RenderPlan {
        let m = self.settings.margin_mm;
        let content_box = BoxMm::new(
            m,
            m,
            profile.width_mm - 2.0 * m,
            profile.height_mm - 2.0 * m,
        );
        let mut builder = PlanBuilder {
            settings: &self.settings,
            font: FontClass::from_family(&style.font_family),
            content: content_box,
            blocks: Vec::new(),
            images: Vec::new(),
        };

        let variant = page.layout();
        match &page.kind {
            PageKind::Cover(cover) => builder.cover(
                &cover.title,
                cover.subtitle.as_deref(),
                Some(cover.author.as_str()),
                cover.image.as_deref(),
                profile,
            ),
            PageKind::End(end) => builder.end(
                end.title.as_deref(),
                &end.body,
                Some(&end.colophon),
                end.barcode.as_deref(),
            ),
            PageKind::Content(content) => {
                let title = content.title.as_deref();
                let body = content.body.as_str();
                let image = content.images.first().map(String::as_str);
                match content.layout {
                    PageLayout::Standard => builder.standard(title, body),
                    PageLayout::TwoColumn => builder.two_column(title, body),
                    PageLayout::ImageLeft => builder.image_side(title, body, image, Side::Left),
                    PageLayout::ImageRight => builder.image_side(title, body, image, Side::Right),
                    PageLayout::ImageTop => builder.image_band(title, body, image, Side::Top),
                    PageLayout::ImageBottom => {
                        builder.image_band(title, body, image, Side::Bottom)
                    }
                    PageLayout::FullImage => builder.full_image(image),
                    PageLayout::Cover => {
                        let subtitle = Some(body).filter(|b| !b.trim().is_empty());
                        builder.cover(title.unwrap_or_default(), subtitle, None, image, profile)
                    }
                    PageLayout::End => builder.end(title, body, None, None),
                }
                builder.page_number(page.page_number, profile);
            }
        }

        tracing::trace!(
            page_number = page.page_number,
            variant = %variant,
            blocks = builder.blocks.len(),
            images = builder.images.len(),
            "laid out page"
        );

        RenderPlan {
            page_number: page.page_number,
            page_type: page.page_type(),
            variant,
            page: *profile,
            content_box,
            images: builder.images,
            blocks: builder.blocks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

struct PlanBuilder<'a> {
    settings: &'a LayoutSettings,
    font: FontClass,
    content: BoxMm,
    blocks: Vec<TextBlock>,
    images: Vec<ImageSlot>,
}

impl PlanBuilder<'_> {
    fn text(
        &mut self,
        role: TextRole,
        rect: BoxMm,
        font_size_pt: f64,
        line_height_mm: f64,
        align: TextAlign,
        text: &str,
    ) -> &mut TextBlock {
        let font = if role == TextRole::Barcode {
            FontClass::Mono
        } else {
            self.font
        };
        let flowed = flow::flow(text, &rect, font, font_size_pt, line_height_mm);
        self.blocks.push(TextBlock {
            role,
            rect,
            font,
            font_size_pt,
            line_height_mm,
            align,
            lines: flowed.lines,
            truncated: flowed.truncated,
            paragraphs: Vec::new(),
        });
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }

    /// Box tall enough for every wrapped line of `text`, but never past `limit`.
    /// Lines that do not fit above `limit` are truncated.
    fn fitted(
        &mut self,
        role: TextRole,
        y: f64,
        limit: f64,
        size: f64,
        align: TextAlign,
        text: &str,
    ) -> f64 {
        let lh = self.settings.line_height_mm(size);
        let y = y.min(limit);
        let count = flow::wrap(text, self.content.width, self.font, size).len();
        let fit = count.min(flow::max_lines(limit - y, lh));
        let rect = BoxMm::new(self.content.x, y, self.content.width, fit as f64 * lh);
        self.text(role, rect, size, lh, align, text);
        rect.bottom()
    }

    /// Place an optional title at the top of the content box; returns where the
    /// rest of the page starts.
    fn title(&mut self, title: Option<&str>) -> f64 {
        match title.filter(|t| !t.trim().is_empty()) {
            Some(title) => {
                let limit = self.content.bottom();
                let bottom = self.fitted(
                    TextRole::Title,
                    self.content.y,
                    limit,
                    self.settings.title_font_size_pt,
                    TextAlign::Left,
                    title,
                );
                (bottom + self.settings.gap_mm / 2.0).min(limit)
            }
            None => self.content.y,
        }
    }

    fn body(&mut self, rect: BoxMm, body: &str) -> &mut TextBlock {
        let size = self.settings.body_font_size_pt;
        let lh = self.settings.line_height_mm(size);
        let rect = BoxMm::new(rect.x, rect.y, rect.width, rect.height.max(0.0));
        self.text(TextRole::Body, rect, size, lh, TextAlign::Left, body)
    }

    fn image(&mut self, uri: Option<&str>, rect: BoxMm) {
        if let Some(uri) = uri {
            self.images.push(ImageSlot {
                uri: uri.to_string(),
                rect,
            });
        }
    }

    fn cover(
        &mut self,
        title: &str,
        subtitle: Option<&str>,
        author: Option<&str>,
        image: Option<&str>,
        profile: &DimensionProfile,
    ) {
        let c = self.content;
        self.image(image, BoxMm::new(c.x, c.y, c.width, c.height / 2.0));

        let author = author.filter(|a| !a.trim().is_empty());
        let author_lh = self.settings.line_height_mm(self.settings.author_font_size_pt);
        // title and subtitle stay above the author line
        let limit = if author.is_some() {
            c.bottom() - author_lh
        } else {
            c.bottom()
        };

        let size = self.settings.title_font_size_pt;
        let lh = self.settings.line_height_mm(size);
        let title_lines = flow::wrap(title, c.width, self.font, size)
            .len()
            .min(flow::max_lines(limit - c.y, lh));
        let title_height = title_lines as f64 * lh;
        let title_y = (profile.height_mm / 2.0 - title_height / 2.0)
            .max(c.y)
            .min(limit - title_height);
        let mut bottom = self.fitted(TextRole::Title, title_y, limit, size, TextAlign::Center, title);

        if let Some(subtitle) = subtitle.filter(|s| !s.trim().is_empty()) {
            bottom += self.settings.gap_mm / 2.0;
            self.fitted(
                TextRole::Subtitle,
                bottom,
                limit,
                self.settings.subtitle_font_size_pt,
                TextAlign::Center,
                subtitle,
            );
        }

        if let Some(author) = author {
            let size = self.settings.author_font_size_pt;
            let rect = BoxMm::new(c.x, c.bottom() - author_lh, c.width, author_lh);
            self.text(TextRole::Author, rect, size, author_lh, TextAlign::Center, author);
        }
    }

    fn standard(&mut self, title: Option<&str>, body: &str) {
        let top = self.title(title);
        let c = self.content;
        self.body(BoxMm::new(c.x, top, c.width, c.bottom() - top), body);
    }

    /// Paragraphs are divided by count, not by measured height: the first
    /// column takes `ceil(n / 2)` of them.
    fn two_column(&mut self, title: Option<&str>, body: &str) {
        let top = self.title(title);
        let c = self.content;
        let gap = self.settings.gap_mm;
        let column_width = (c.width - gap) / 2.0;
        let height = c.bottom() - top;

        let paragraphs = flow::split_paragraphs(body);
        let split = paragraphs.len().div_ceil(2);
        let (first, second) = paragraphs.split_at(split);

        for (i, column) in [first, second].into_iter().enumerate() {
            let x = c.x + i as f64 * (column_width + gap);
            let rect = BoxMm::new(x, top, column_width, height);
            let block = self.body(rect, &column.join("\n\n"));
            block.paragraphs = column.to_vec();
        }
    }

    fn image_side(&mut self, title: Option<&str>, body: &str, image: Option<&str>, side: Side) {
        let top = self.title(title);
        let c = self.content;
        let gap = self.settings.gap_mm;
        let half = (c.width - gap) / 2.0;
        let height = c.bottom() - top;
        let left = BoxMm::new(c.x, top, half, height);
        let right = BoxMm::new(c.x + half + gap, top, half, height);

        let (image_box, text_box) = match side {
            Side::Left => (left, right),
            _ => (right, left),
        };
        self.image(image, image_box);
        self.body(text_box, body);
    }

    fn image_band(&mut self, title: Option<&str>, body: &str, image: Option<&str>, side: Side) {
        let top = self.title(title);
        let c = self.content;
        let gap = self.settings.gap_mm;
        let available = c.bottom() - top;
        let band = self.settings.image_band_mm.min(available.max(0.0));
        let text_height = available - band - gap;

        if side == Side::Top {
            self.image(image, BoxMm::new(c.x, top, c.width, band));
            self.body(
                BoxMm::new(c.x, top + band + gap, c.width, text_height),
                body,
            );
        } else {
            self.body(BoxMm::new(c.x, top, c.width, text_height), body);
            self.image(image, BoxMm::new(c.x, c.bottom() - band, c.width, band));
        }
    }

    fn full_image(&mut self, image: Option<&str>) {
        self.image(image, self.content);
    }

    fn end(
        &mut self,
        title: Option<&str>,
        body: &str,
        colophon: Option<&Colophon>,
        barcode: Option<&str>,
    ) {
        let top = self.title(title);
        let c = self.content;
        let spacing = self.settings.info_line_spacing_mm;
        let info_size = self.settings.info_font_size_pt;

        let mut bottom = c.bottom();
        if let Some(isbn) = barcode {
            let rect = BoxMm::new(c.x, bottom - spacing, c.width, spacing);
            let text = format!("||| ISBN {} |||", isbn);
            self.text(TextRole::Barcode, rect, info_size, spacing, TextAlign::Center, &text);
            bottom = rect.y - spacing / 2.0;
        }

        if let Some(colophon) = colophon {
            let lines = info_lines(colophon);
            if !lines.is_empty() {
                let height = lines.len() as f64 * spacing;
                let rect = BoxMm::new(c.x, bottom - height, c.width, height);
                self.text(
                    TextRole::Info,
                    rect,
                    info_size,
                    spacing,
                    TextAlign::Center,
                    &lines.join("\n"),
                );
                bottom = rect.y;
            }
        }

        let body_bottom = bottom - self.settings.gap_mm / 2.0;
        self.body(BoxMm::new(c.x, top, c.width, body_bottom - top), body);
    }

    fn page_number(&mut self, page_number: u32, profile: &DimensionProfile) {
        let size = self.settings.page_number_font_size_pt;
        let lh = self.settings.line_height_mm(size);
        let m = self.settings.margin_mm;
        let width = self.settings.page_number_box_width_mm;
        let y = profile.height_mm - m / 2.0 - lh / 2.0;

        let (x, align) = if page_number % 2 == 0 {
            (m, TextAlign::Left)
        } else {
            (profile.width_mm - m - width, TextAlign::Right)
        };
        let rect = BoxMm::new(x, y, width, lh);
        self.text(
            TextRole::PageNumber,
            rect,
            size,
            lh,
            align,
            &page_number.to_string(),
        );
    }
}

fn info_lines(colophon: &Colophon) -> Vec<String> {
    let mut lines = Vec::new();
    if !colophon.title.is_empty() {
        lines.push(colophon.title.clone());
    }
    if !colophon.author.is_empty() {
        lines.push(format!("by {}", colophon.author));
    }
    if let Some(isbn) = &colophon.isbn {
        lines.push(format!("ISBN {}", isbn));
    }
    if let Some(publisher) = &colophon.publisher {
        lines.push(publisher.clone());
    }
    if let Some(copyright) = &colophon.copyright {
        lines.push(format!("© {}", copyright));
    }
    lines
}
