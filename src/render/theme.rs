//! Theme resolution.
//!
//! Turns a page plus its book into the style every renderer applies. The cascade
//! is: book theme, replaced by the cover theme on cover pages, replaced by the
//! page's own override. There is no merging between levels.

use serde::{Deserialize, Serialize};

use crate::models::{Book, Page, Theme, ThemeCatalog};

/// Default page background.
pub const DEFAULT_BACKGROUND: &str = "#ffffff";
/// Default text colour.
pub const DEFAULT_TEXT: &str = "#000000";
/// Default body font family.
pub const DEFAULT_FONT: &str = "serif";

/// The style a page is drawn with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveStyle {
    /// Normalized `#rrggbb`
    pub background_color: String,
    /// Normalized `#rrggbb`
    pub text_color: String,
    pub font_family: String,
}

impl Default for EffectiveStyle {
    fn default() -> Self {
        Self {
            background_color: DEFAULT_BACKGROUND.to_string(),
            text_color: DEFAULT_TEXT.to_string(),
            font_family: DEFAULT_FONT.to_string(),
        }
    }
}

impl EffectiveStyle {
    /// Whether the page needs a background fill at all.
    pub fn has_background(&self) -> bool {
        self.background_color != DEFAULT_BACKGROUND
    }

    pub fn background_rgb(&self) -> Rgb {
        Rgb::parse(&self.background_color).unwrap_or(Rgb::WHITE)
    }

    pub fn text_rgb(&self) -> Rgb {
        Rgb::parse(&self.text_color).unwrap_or(Rgb::BLACK)
    }
}

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Parse `#rrggbb` or `#rgb` (case-insensitive, `#` optional).
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Self {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            3 => {
                let mut digits = hex.chars().map(|c| {
                    let d = c.to_digit(16).unwrap_or(0) as u8;
                    d * 16 + d
                });
                Some(Self {
                    r: digits.next()?,
                    g: digits.next()?,
                    b: digits.next()?,
                })
            }
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Channels scaled to 0.0..=1.0
    pub fn to_unit(&self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

fn color(value: Option<&str>) -> Option<String> {
    value.and_then(Rgb::parse).map(|c| c.to_hex())
}

/// Pick the theme that applies to a page.
pub fn theme_for<'a>(page: &Page, book: &Book, catalog: &'a ThemeCatalog) -> Option<&'a Theme> {
    if let Some(theme) = page
        .theme_override
        .as_deref()
        .and_then(|id| catalog.get(id))
    {
        return Some(theme);
    }

    let cover_theme = if page.is_cover() {
        book.cover_theme_id.as_deref().and_then(|id| catalog.get(id))
    } else {
        None
    };
    cover_theme.or_else(|| book.theme_id.as_deref().and_then(|id| catalog.get(id)))
}

/// Resolve the effective style for a page. Never fails.
pub fn resolve(page: &Page, book: &Book, catalog: &ThemeCatalog) -> EffectiveStyle {
    let Some(theme) = theme_for(page, book, catalog) else {
        return EffectiveStyle::default();
    };

    EffectiveStyle {
        background_color: color(theme.background_color())
            .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string()),
        text_color: color(theme.text_color())
            .or_else(|| color(theme.primary_color()))
            .unwrap_or_else(|| DEFAULT_TEXT.to_string()),
        font_family: theme
            .body_font()
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_FONT.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookInput, PageInput};
    use serde_json::json;

    fn catalog() -> ThemeCatalog {
        ThemeCatalog::from_themes([
            Theme::new("book", "Book").with_template(json!({
                "colors": { "background": "#FDF6E3", "text": "#333333" },
                "fonts": { "body": "Georgia" }
            })),
            Theme::new("cover", "Cover").with_template(json!({
                "colors": { "background": "#102030", "primary": "#ffcc00" }
            })),
            Theme::new("night", "Night").with_template(json!({
                "colors": { "background": "#000" }
            })),
            Theme::new("broken", "Broken").with_template(json!({
                "colors": { "background": "chartreuse-ish", "text": 7 }
            })),
        ])
    }

    fn book(pages: Vec<PageInput>) -> Book {
        let mut input = BookInput::new("Themed", "A").with_pages(pages);
        input.theme_id = Some("book".to_string());
        input.cover_theme_id = Some("cover".to_string());
        Book::from_input(input).unwrap()
    }

    #[test]
    fn test_book_theme_applies_to_content() {
        let book = book(vec![PageInput::new("content", "x")]);
        let style = resolve(&book.pages[0], &book, &catalog());
        assert_eq!(style.background_color, "#fdf6e3");
        assert_eq!(style.text_color, "#333333");
        assert_eq!(style.font_family, "Georgia");
    }

    #[test]
    fn test_cover_theme_replaces_book_theme() {
        let book = book(vec![PageInput::new("cover", "")]);
        let style = resolve(&book.pages[0], &book, &catalog());
        assert_eq!(style.background_color, "#102030");
        // text falls back to primary
        assert_eq!(style.text_color, "#ffcc00");
        // no merge with the book theme's font
        assert_eq!(style.font_family, "serif");
    }

    #[test]
    fn test_missing_cover_theme_falls_back_to_book_theme() {
        let mut book = book(vec![PageInput::new("cover", "")]);
        book.cover_theme_id = Some("does-not-exist".to_string());
        let style = resolve(&book.pages[0], &book, &catalog());
        assert_eq!(style.background_color, "#fdf6e3");
    }

    #[test]
    fn test_override_replaces_entirely() {
        let book = book(vec![
            PageInput::new("content", "x").with_theme_override("night"),
        ]);
        let style = resolve(&book.pages[0], &book, &catalog());
        assert_eq!(style.background_color, "#000000");
        assert_eq!(style.text_color, DEFAULT_TEXT);
        assert_eq!(style.font_family, DEFAULT_FONT);
    }

    #[test]
    fn test_unresolvable_override_is_ignored() {
        let book = book(vec![
            PageInput::new("content", "x").with_theme_override("ghost"),
        ]);
        let style = resolve(&book.pages[0], &book, &catalog());
        assert_eq!(style.font_family, "Georgia");
    }

    #[test]
    fn test_malformed_theme_uses_defaults() {
        let book = book(vec![
            PageInput::new("content", "x").with_theme_override("broken"),
        ]);
        let style = resolve(&book.pages[0], &book, &catalog());
        assert_eq!(style, EffectiveStyle::default());
        assert!(!style.has_background());
    }

    #[test]
    fn test_no_theme_at_all() {
        let book = Book::from_input(
            BookInput::new("Plain", "A").with_pages(vec![PageInput::new("content", "x")]),
        )
        .unwrap();
        let style = resolve(&book.pages[0], &book, &ThemeCatalog::new());
        assert_eq!(style, EffectiveStyle::default());
    }

    #[test]
    fn test_resolve_is_pure() {
        let book = book(vec![
            PageInput::new("cover", ""),
            PageInput::new("content", "x"),
            PageInput::new("content", "y").with_theme_override("night"),
            PageInput::new("end", "z"),
        ]);
        let catalog = catalog();
        for page in &book.pages {
            assert_eq!(
                resolve(page, &book, &catalog),
                resolve(page, &book, &catalog)
            );
        }
    }

    #[test]
    fn test_rgb_parse() {
        assert_eq!(Rgb::parse("#ffffff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::parse("000"), Some(Rgb::BLACK));
        assert_eq!(
            Rgb::parse("#1A2B3C"),
            Some(Rgb {
                r: 0x1a,
                g: 0x2b,
                b: 0x3c
            })
        );
        assert_eq!(Rgb::parse("#12345"), None);
        assert_eq!(Rgb::parse("red"), None);
        assert_eq!(Rgb::parse("#ééé"), None);
    }
}
