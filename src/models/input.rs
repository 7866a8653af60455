//! Wire types accepted from the editor layer.
//!
//! These mirror the JSON the editor sends and are deliberately permissive:
//! every field is optional so that validation can produce a useful message
//! instead of a serde error. [`crate::models::Book::from_input`] turns them into
//! the typed model.

use serde::{Deserialize, Serialize};

use super::BookMetadata;

/// Per-page theme override as sent by the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeOverride {
    #[serde(default)]
    pub theme_id: Option<String>,
}

/// A page record as received on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageInput {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub book_id: Option<String>,

    #[serde(default)]
    pub page_number: Option<u32>,

    /// "cover", "content" or "end"
    #[serde(default)]
    pub page_type: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub images: Option<Vec<String>>,

    #[serde(default)]
    pub theme_override: Option<ThemeOverride>,

    /// One of the nine layout names, e.g. "two-column"
    #[serde(default)]
    pub layout: Option<String>,
}

impl PageInput {
    /// Shorthand used by tests and fixtures.
    pub fn new(page_type: &str, content: &str) -> Self {
        Self {
            page_type: Some(page_type.to_string()),
            content: Some(content.to_string()),
            ..Self::default()
        }
    }

    pub fn with_number(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_layout(mut self, layout: &str) -> Self {
        self.layout = Some(layout.to_string());
        self
    }

    pub fn with_images(mut self, images: &[&str]) -> Self {
        self.images = Some(images.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_theme_override(mut self, theme_id: &str) -> Self {
        self.theme_override = Some(ThemeOverride {
            theme_id: Some(theme_id.to_string()),
        });
        self
    }
}

/// A book record as received on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookInput {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub subtitle: Option<String>,

    #[serde(default)]
    pub author_name: Option<String>,

    #[serde(default)]
    pub isbn: Option<String>,

    #[serde(default)]
    pub dimensions: Option<String>,

    #[serde(default)]
    pub theme_id: Option<String>,

    #[serde(default)]
    pub cover_theme_id: Option<String>,

    #[serde(default)]
    pub total_pages: Option<u32>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub metadata: Option<BookMetadata>,

    #[serde(default)]
    pub pages: Option<Vec<PageInput>>,
}

impl BookInput {
    /// Shorthand used by tests and fixtures.
    pub fn new(title: &str, author_name: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            author_name: Some(author_name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_dimensions(mut self, dimensions: &str) -> Self {
        self.dimensions = Some(dimensions.to_string());
        self
    }

    pub fn with_pages(mut self, pages: Vec<PageInput>) -> Self {
        self.pages = Some(pages);
        self
    }
}

/// Strip surrounding whitespace and drop empty strings.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
