//! Theme reference data.
//!
//! Themes are read-only for the lifetime of a preview session or an export. The
//! catalog is loaded once and shared behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::Result;

/// Where a theme is meant to be applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeCategory {
    Cover,
    Page,
    #[default]
    Complete,
    #[serde(other)]
    Unknown,
}

/// A named colour/font bundle.
///
/// `template_data` is kept as raw JSON: themes come from an external editor and
/// may be incomplete or malformed. Accessors below return `None` for anything
/// that is missing or not a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub category: ThemeCategory,

    #[serde(default)]
    pub template_data: serde_json::Value,

    #[serde(default)]
    pub is_premium: bool,
}

impl Theme {
    /// Create a theme with no template data.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category: ThemeCategory::Complete,
            template_data: serde_json::Value::Null,
            is_premium: false,
        }
    }

    /// Builder-style helper to set template data.
    pub fn with_template(mut self, template_data: serde_json::Value) -> Self {
        self.template_data = template_data;
        self
    }

    fn string_at(&self, section: &str, key: &str) -> Option<&str> {
        self.template_data
            .get(section)?
            .get(key)?
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// `template_data.colors.background`
    pub fn background_color(&self) -> Option<&str> {
        self.string_at("colors", "background")
    }

    /// `template_data.colors.text`
    pub fn text_color(&self) -> Option<&str> {
        self.string_at("colors", "text")
    }

    /// `template_data.colors.primary`
    pub fn primary_color(&self) -> Option<&str> {
        self.string_at("colors", "primary")
    }

    /// `template_data.fonts.body`
    pub fn body_font(&self) -> Option<&str> {
        self.string_at("fonts", "body")
    }
}

/// All themes known to a session, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeCatalog {
    themes: BTreeMap<String, Theme>,
}

impl ThemeCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a list of themes. Later duplicates win.
    pub fn from_themes(themes: impl IntoIterator<Item = Theme>) -> Self {
        let themes = themes.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self { themes }
    }

    /// Parse a catalog from JSON.
    ///
    /// Accepts either a bare array of themes or an object with a `themes` array.
    /// Entries that do not deserialize as a theme are skipped with a warning.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let entries = match value {
            serde_json::Value::Array(entries) => entries,
            serde_json::Value::Object(mut map) => match map.remove("themes") {
                Some(serde_json::Value::Array(entries)) => entries,
                _ => {
                    return Err(crate::Error::InvalidInput(
                        "theme catalog must be an array or contain a `themes` array".to_string(),
                    ));
                }
            },
            _ => {
                return Err(crate::Error::InvalidInput(
                    "theme catalog must be an array or contain a `themes` array".to_string(),
                ));
            }
        };

        let mut themes = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<Theme>(entry) {
                Ok(theme) => themes.push(theme),
                Err(e) => tracing::warn!(error = %e, "skipping malformed theme entry"),
            }
        }
        Ok(Self::from_themes(themes))
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), themes = catalog.len(), "loaded theme catalog");
        Ok(catalog)
    }

    /// Look up a theme by id.
    pub fn get(&self, id: &str) -> Option<&Theme> {
        self.themes.get(id)
    }

    /// Add or replace a theme.
    pub fn insert(&mut self, theme: Theme) {
        self.themes.insert(theme.id.clone(), theme);
    }

    /// Iterate themes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Theme> {
        self.themes.values()
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors_read_nested_values() {
        let theme = Theme::new("forest", "Forest").with_template(json!({
            "colors": { "background": "#eef5e9", "primary": "#2f4f2f" },
            "fonts": { "body": "Georgia" }
        }));
        assert_eq!(theme.background_color(), Some("#eef5e9"));
        assert_eq!(theme.text_color(), None);
        assert_eq!(theme.primary_color(), Some("#2f4f2f"));
        assert_eq!(theme.body_font(), Some("Georgia"));
    }

    #[test]
    fn test_accessors_tolerate_malformed_data() {
        let theme = Theme::new("broken", "Broken").with_template(json!({
            "colors": "not an object",
            "fonts": { "body": 42 }
        }));
        assert_eq!(theme.background_color(), None);
        assert_eq!(theme.body_font(), None);
    }

    #[test]
    fn test_catalog_from_array_skips_bad_entries() {
        let catalog = ThemeCatalog::from_json(
            r#"[
                {"id": "a", "display_name": "A", "category": "cover"},
                {"display_name": "missing id"},
                {"id": "b", "category": "something-new"}
            ]"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("a").unwrap().category, ThemeCategory::Cover);
        assert_eq!(catalog.get("b").unwrap().category, ThemeCategory::Unknown);
    }

    #[test]
    fn test_catalog_from_wrapped_object() {
        let catalog = ThemeCatalog::from_json(r#"{"themes": [{"id": "x"}]}"#).unwrap();
        assert!(catalog.get("x").is_some());
    }

    #[test]
    fn test_catalog_rejects_scalar() {
        assert!(ThemeCatalog::from_json("42").is_err());
    }
}
