//! Data models for books.
//!
//! This module defines the core data structures:
//! - `Book` - Title, credits, trim size, theme assignments and ordered pages
//! - `Page` - One unit of the book; `PageKind` is a closed union over cover, content and end
//! - `Theme` / `ThemeCatalog` - Read-only colour and font bundles
//! - `Dimensions` / `DimensionProfile` - The fixed trim-size table
//!
//! Wire records (`BookInput`, `PageInput`) are validated once by [`Book::from_input`];
//! the layout engine only ever sees the typed model.

pub mod dimensions;
pub mod input;
pub mod store;
pub mod theme;

pub use dimensions::{DimensionProfile, Dimensions, MM_PER_PT, Orientation, mm_to_pt, pt_to_mm};
pub use input::{BookInput, PageInput, ThemeOverride};
pub use store::BookStore;
pub use theme::{Theme, ThemeCatalog, ThemeCategory};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::{Error, Result};
use input::non_blank;

/// Book lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
    Exported,
    #[serde(other)]
    Unknown,
}

impl BookStatus {
    /// Parse from string, case-insensitive. Unknown values map to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "draft" => Self::Draft,
            "in_progress" | "in-progress" => Self::InProgress,
            "completed" | "complete" => Self::Completed,
            "exported" => Self::Exported,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Exported => "exported",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Publishing metadata attached to a book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Print a barcode placeholder on the end page (requires an ISBN)
    #[serde(default)]
    pub include_barcode: bool,

    #[serde(default)]
    pub include_price: bool,
}

/// Page kind as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Cover,
    Content,
    End,
}

impl PageType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cover" => Some(Self::Cover),
            "content" => Some(Self::Content),
            "end" => Some(Self::End),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Content => "content",
            Self::End => "end",
        }
    }
}

/// The nine page layout variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageLayout {
    #[default]
    Standard,
    TwoColumn,
    ImageLeft,
    ImageRight,
    ImageTop,
    ImageBottom,
    FullImage,
    Cover,
    End,
}

impl PageLayout {
    pub const ALL: [PageLayout; 9] = [
        PageLayout::Standard,
        PageLayout::TwoColumn,
        PageLayout::ImageLeft,
        PageLayout::ImageRight,
        PageLayout::ImageTop,
        PageLayout::ImageBottom,
        PageLayout::FullImage,
        PageLayout::Cover,
        PageLayout::End,
    ];

    /// Parse a layout name. Accepts kebab, snake and camel spellings.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "standard" | "content" => Some(Self::Standard),
            "twocolumn" => Some(Self::TwoColumn),
            "imageleft" => Some(Self::ImageLeft),
            "imageright" => Some(Self::ImageRight),
            "imagetop" => Some(Self::ImageTop),
            "imagebottom" => Some(Self::ImageBottom),
            "fullimage" => Some(Self::FullImage),
            "cover" => Some(Self::Cover),
            "end" => Some(Self::End),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::TwoColumn => "two-column",
            Self::ImageLeft => "image-left",
            Self::ImageRight => "image-right",
            Self::ImageTop => "image-top",
            Self::ImageBottom => "image-bottom",
            Self::FullImage => "full-image",
            Self::Cover => "cover",
            Self::End => "end",
        }
    }
}

impl fmt::Display for PageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Front cover content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverPage {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A body page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub layout: PageLayout,
}

/// The info block printed on the end page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Colophon {
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
}

/// Back matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    pub colophon: Colophon,
    /// ISBN to print as a barcode placeholder, present only when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

/// What a page is, with only the fields that kind of page uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "page_type", rename_all = "lowercase")]
pub enum PageKind {
    Cover(CoverPage),
    Content(ContentPage),
    End(EndPage),
}

/// One page of a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub book_id: String,
    /// 1-based position in the book
    pub page_number: u32,
    /// Theme id that replaces the book-level theme for this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_override: Option<String>,
    #[serde(flatten)]
    pub kind: PageKind,
}

impl Page {
    pub fn page_type(&self) -> PageType {
        match self.kind {
            PageKind::Cover(_) => PageType::Cover,
            PageKind::Content(_) => PageType::Content,
            PageKind::End(_) => PageType::End,
        }
    }

    pub fn is_cover(&self) -> bool {
        matches!(self.kind, PageKind::Cover(_))
    }

    /// Layout variant this page renders with.
    ///
    /// Cover and end pages always use their own variant; content pages use
    /// whatever layout the editor assigned.
    pub fn layout(&self) -> PageLayout {
        match &self.kind {
            PageKind::Cover(_) => PageLayout::Cover,
            PageKind::Content(content) => content.layout,
            PageKind::End(_) => PageLayout::End,
        }
    }
}

/// A complete book: metadata plus ordered pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub author_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub dimensions: Dimensions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_theme_id: Option<String>,
    pub total_pages: u32,
    pub status: BookStatus,
    #[serde(default)]
    pub metadata: BookMetadata,
    /// Bumped on every page-set replacement
    #[serde(default)]
    pub version: u64,
    pub pages: Vec<Page>,
}

impl Book {
    /// Validate a wire record and build the typed model.
    ///
    /// Rejects a missing title and a missing or empty page list. Everything else
    /// that is unexpected (unknown page types, layouts or dimensions) falls back to a
    /// default with a warning.
    pub fn from_input(input: BookInput) -> Result<Self> {
        let title = non_blank(input.title.as_deref())
            .ok_or_else(|| Error::Validation("Book title is required".to_string()))?;

        let pages = match input.pages {
            Some(pages) if !pages.is_empty() => pages,
            _ => {
                return Err(Error::Validation(
                    "Book must contain at least one page".to_string(),
                ));
            }
        };

        let dimensions = input
            .dimensions
            .as_deref()
            .map(Dimensions::parse_or_default)
            .unwrap_or_default();

        let mut book = Book {
            id: non_blank(input.id.as_deref()).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            title,
            subtitle: non_blank(input.subtitle.as_deref()),
            author_name: non_blank(input.author_name.as_deref()).unwrap_or_default(),
            isbn: non_blank(input.isbn.as_deref()),
            dimensions,
            theme_id: non_blank(input.theme_id.as_deref()),
            cover_theme_id: non_blank(input.cover_theme_id.as_deref()),
            total_pages: 0,
            status: input
                .status
                .as_deref()
                .map(BookStatus::parse)
                .unwrap_or_default(),
            metadata: input.metadata.unwrap_or_default(),
            version: 0,
            pages: Vec::new(),
        };
        book.pages = book.build_pages(pages)?;
        book.total_pages = book.pages.len() as u32;
        Ok(book)
    }

    /// Turn wire page records into typed pages using this book's header fields.
    ///
    /// Pages come back sorted by page number. Missing numbers take their 1-based
    /// array position; duplicates are rejected.
    pub fn build_pages(&self, inputs: Vec<PageInput>) -> Result<Vec<Page>> {
        let mut seen = HashSet::new();
        let mut pages = Vec::with_capacity(inputs.len());

        for (index, input) in inputs.into_iter().enumerate() {
            let page_number = input.page_number.unwrap_or(index as u32 + 1);
            if page_number == 0 {
                return Err(Error::Validation("Page numbers start at 1".to_string()));
            }
            if !seen.insert(page_number) {
                return Err(Error::Validation(format!(
                    "Duplicate page number {}",
                    page_number
                )));
            }
            pages.push(self.build_page(page_number, input));
        }

        pages.sort_by_key(|p| p.page_number);
        for (expected, page) in (1u32..).zip(&pages) {
            if page.page_number != expected {
                tracing::warn!(
                    book_id = %self.id,
                    page_number = page.page_number,
                    expected,
                    "page numbers are not contiguous"
                );
                break;
            }
        }
        Ok(pages)
    }

    fn build_page(&self, page_number: u32, input: PageInput) -> Page {
        let page_type = match input.page_type.as_deref() {
            None => PageType::Content,
            Some(raw) => PageType::parse(raw).unwrap_or_else(|| {
                tracing::warn!(page_number, page_type = raw, "unknown page type, using content");
                PageType::Content
            }),
        };
        let title = non_blank(input.title.as_deref());
        let body = input.content.unwrap_or_default();
        let images: Vec<String> = input
            .images
            .unwrap_or_default()
            .into_iter()
            .filter(|uri| !uri.trim().is_empty())
            .collect();

        let kind = match page_type {
            PageType::Cover => PageKind::Cover(CoverPage {
                title: title.unwrap_or_else(|| self.title.clone()),
                subtitle: self.subtitle.clone(),
                author: self.author_name.clone(),
                image: images.into_iter().next(),
            }),
            PageType::Content => {
                let layout = match input.layout.as_deref() {
                    None => PageLayout::Standard,
                    Some(raw) => PageLayout::parse(raw).unwrap_or_else(|| {
                        tracing::warn!(page_number, layout = raw, "unknown layout, using standard");
                        PageLayout::Standard
                    }),
                };
                PageKind::Content(ContentPage {
                    title,
                    body,
                    images,
                    layout,
                })
            }
            PageType::End => PageKind::End(EndPage {
                title,
                body,
                colophon: self.colophon(),
                barcode: self.barcode(),
            }),
        };

        Page {
            id: non_blank(input.id.as_deref())
                .unwrap_or_else(|| format!("{}-p{}", self.id, page_number)),
            book_id: self.id.clone(),
            page_number,
            theme_override: input
                .theme_override
                .and_then(|o| non_blank(o.theme_id.as_deref())),
            kind,
        }
    }

    fn colophon(&self) -> Colophon {
        Colophon {
            title: self.title.clone(),
            author: self.author_name.clone(),
            isbn: self.isbn.clone(),
            publisher: self.metadata.publisher.clone(),
            copyright: self.metadata.copyright.clone(),
        }
    }

    fn barcode(&self) -> Option<String> {
        if self.metadata.include_barcode {
            self.isbn.clone()
        } else {
            None
        }
    }

    /// Physical size of every page in this book.
    pub fn profile(&self) -> DimensionProfile {
        self.dimensions.profile()
    }

    /// Find a page by its page number.
    pub fn page(&self, page_number: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> BookInput {
        BookInput::new("The Lighthouse", "Ada Byron")
            .with_dimensions("6x9")
            .with_pages(vec![
                PageInput::new("cover", ""),
                PageInput::new("content", "Once upon a time.").with_layout("two-column"),
                PageInput::new("end", "Goodnight."),
            ])
    }

    #[test]
    fn test_from_input_builds_typed_pages() {
        let book = Book::from_input(sample_input()).unwrap();
        assert_eq!(book.total_pages, 3);
        assert_eq!(book.dimensions, Dimensions::Trade6x9);
        assert_eq!(book.pages[0].page_type(), PageType::Cover);
        assert_eq!(book.pages[1].layout(), PageLayout::TwoColumn);
        assert_eq!(book.pages[2].layout(), PageLayout::End);
        match &book.pages[0].kind {
            PageKind::Cover(cover) => {
                assert_eq!(cover.title, "The Lighthouse");
                assert_eq!(cover.author, "Ada Byron");
            }
            other => panic!("expected cover, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_title_is_validation_error() {
        let mut input = sample_input();
        input.title = None;
        let err = Book::from_input(input).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_blank_title_is_validation_error() {
        let mut input = sample_input();
        input.title = Some("   ".to_string());
        assert!(matches!(Book::from_input(input), Err(Error::Validation(_))));
    }

    #[test]
    fn test_missing_pages_is_validation_error() {
        let input = BookInput::new("Empty", "Nobody");
        assert!(matches!(Book::from_input(input), Err(Error::Validation(_))));
        let input = BookInput::new("Empty", "Nobody").with_pages(vec![]);
        assert!(matches!(Book::from_input(input), Err(Error::Validation(_))));
    }

    #[test]
    fn test_pages_are_sorted_by_number() {
        let input = BookInput::new("Shuffled", "A").with_pages(vec![
            PageInput::new("end", "").with_number(3),
            PageInput::new("cover", "").with_number(1),
            PageInput::new("content", "middle").with_number(2),
        ]);
        let book = Book::from_input(input).unwrap();
        let numbers: Vec<u32> = book.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(book.pages[0].page_type(), PageType::Cover);
    }

    #[test]
    fn test_duplicate_page_numbers_rejected() {
        let input = BookInput::new("Dupes", "A").with_pages(vec![
            PageInput::new("content", "a").with_number(1),
            PageInput::new("content", "b").with_number(1),
        ]);
        assert!(matches!(Book::from_input(input), Err(Error::Validation(_))));
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let input = BookInput::new("Odd", "A")
            .with_dimensions("tabloid")
            .with_pages(vec![PageInput::new("poster", "x").with_layout("diagonal")]);
        let book = Book::from_input(input).unwrap();
        assert_eq!(book.dimensions, Dimensions::A4);
        assert_eq!(book.pages[0].page_type(), PageType::Content);
        assert_eq!(book.pages[0].layout(), PageLayout::Standard);
    }

    #[test]
    fn test_barcode_requires_flag_and_isbn() {
        let mut input = sample_input();
        input.isbn = Some("978-0-00-000000-2".to_string());
        let book = Book::from_input(input.clone()).unwrap();
        match &book.pages[2].kind {
            PageKind::End(end) => assert_eq!(end.barcode, None),
            _ => unreachable!(),
        }

        input.metadata = Some(BookMetadata {
            include_barcode: true,
            ..BookMetadata::default()
        });
        let book = Book::from_input(input).unwrap();
        match &book.pages[2].kind {
            PageKind::End(end) => {
                assert_eq!(end.barcode.as_deref(), Some("978-0-00-000000-2"));
                assert_eq!(end.colophon.isbn.as_deref(), Some("978-0-00-000000-2"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_layout_parse_spellings() {
        assert_eq!(PageLayout::parse("two-column"), Some(PageLayout::TwoColumn));
        assert_eq!(PageLayout::parse("two_column"), Some(PageLayout::TwoColumn));
        assert_eq!(PageLayout::parse("imageLeft"), Some(PageLayout::ImageLeft));
        assert_eq!(PageLayout::parse("nope"), None);
        for layout in PageLayout::ALL {
            assert_eq!(PageLayout::parse(layout.as_str()), Some(layout));
        }
    }

    #[test]
    fn test_book_serializes_page_type_tag() {
        let book = Book::from_input(sample_input()).unwrap();
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["pages"][0]["page_type"], "cover");
        assert_eq!(json["pages"][1]["layout"], "two-column");
        assert_eq!(json["dimensions"], "6x9");
    }
}
