//! Text flow: word wrapping and fitting text into a box.
//!
//! Measurement is deterministic and font-file free. Each font class has an
//! average advance in em; East Asian wide characters count double. The preview
//! and the PDF both read the wrapped lines produced here, so the metric only
//! needs to be plausible, not exact.

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

use super::plan::BoxMm;
use crate::models::pt_to_mm;

const EPS: f64 = 1e-9;

/// Broad font family class used for metrics and font selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontClass {
    #[default]
    Serif,
    Sans,
    Mono,
}

impl FontClass {
    /// Classify a CSS-ish family name such as `"Georgia"` or `"sans-serif"`.
    pub fn from_family(family: &str) -> Self {
        let family = family.to_lowercase();
        const MONO: [&str; 5] = ["mono", "courier", "consol", "code", "typewriter"];
        const SANS: [&str; 7] = [
            "sans", "helvetica", "arial", "verdana", "inter", "roboto", "gothic",
        ];
        if MONO.iter().any(|m| family.contains(m)) {
            Self::Mono
        } else if SANS.iter().any(|s| family.contains(s)) {
            Self::Sans
        } else {
            Self::Serif
        }
    }

    /// Average advance of a narrow glyph, in em.
    pub fn advance_em(&self) -> f64 {
        match self {
            Self::Serif => 0.5,
            Self::Sans => 0.55,
            Self::Mono => 0.6,
        }
    }

    /// The standard PDF font used for this class.
    pub fn pdf_base_font(&self) -> &'static str {
        match self {
            Self::Serif => "Times-Roman",
            Self::Sans => "Helvetica",
            Self::Mono => "Courier",
        }
    }
}

/// Width of a single line of text in millimetres.
pub fn text_width_mm(text: &str, font: FontClass, font_size_pt: f64) -> f64 {
    let columns: usize = text.chars().map(|c| c.width().unwrap_or(0)).sum();
    columns as f64 * font.advance_em() * pt_to_mm(font_size_pt)
}

/// Wrapped text fitted into a box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flow {
    pub lines: Vec<String>,
    /// True if wrapped lines were dropped to fit the box
    pub truncated: bool,
}

/// Number of lines of `line_height_mm` that fit in `height_mm`.
pub fn max_lines(height_mm: f64, line_height_mm: f64) -> usize {
    if line_height_mm <= 0.0 || height_mm <= 0.0 {
        return 0;
    }
    (height_mm / line_height_mm + EPS).floor() as usize
}

/// Word-wrap `text` to `width_mm`.
///
/// Explicit newlines are kept. A run of blank lines becomes a single empty line
/// (a paragraph gap); leading and trailing blank lines are dropped. A word wider
/// than the box is broken between characters.
pub fn wrap(text: &str, width_mm: f64, font: FontClass, font_size_pt: f64) -> Vec<String> {
    let fits = |s: &str| text_width_mm(s, font, font_size_pt) <= width_mm + EPS;
    let mut lines: Vec<String> = Vec::new();

    for raw_line in text.split('\n') {
        let raw_line = raw_line.trim_end_matches('\r');
        if raw_line.trim().is_empty() {
            if lines.last().is_some_and(|l| !l.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }

        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if fits(&candidate) {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if fits(word) {
                current = word.to_string();
                continue;
            }
            // Break an over-long word; each chunk holds at least one character.
            for c in word.chars() {
                let mut next = current.clone();
                next.push(c);
                if !current.is_empty() && !fits(&next) {
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                } else {
                    current = next;
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Wrap `text` into `rect` and drop whatever does not fit.
///
/// At most `floor(rect.height / line_height_mm)` lines are kept. Overflowing text
/// is not continued anywhere; the result only reports that it was cut.
pub fn flow(
    text: &str,
    rect: &BoxMm,
    font: FontClass,
    font_size_pt: f64,
    line_height_mm: f64,
) -> Flow {
    let mut lines = wrap(text, rect.width, font, font_size_pt);
    let max = max_lines(rect.height, line_height_mm);
    let truncated = lines.len() > max;
    if truncated {
        lines.truncate(max);
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
    }
    Flow { lines, truncated }
}

/// Split text into paragraphs on blank lines.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;

    // 10pt serif: 0.5em * 3.5278mm = ~1.764mm per narrow glyph
    const SIZE: f64 = 10.0;

    fn char_width() -> f64 {
        text_width_mm("a", FontClass::Serif, SIZE)
    }

    #[test]
    fn test_font_class_from_family() {
        assert_eq!(FontClass::from_family("serif"), FontClass::Serif);
        assert_eq!(FontClass::from_family("Georgia"), FontClass::Serif);
        assert_eq!(FontClass::from_family("sans-serif"), FontClass::Sans);
        assert_eq!(FontClass::from_family("Helvetica Neue"), FontClass::Sans);
        assert_eq!(FontClass::from_family("JetBrains Mono"), FontClass::Mono);
    }

    #[test]
    fn test_wide_characters_count_double() {
        let narrow = text_width_mm("ab", FontClass::Serif, SIZE);
        let wide = text_width_mm("絵", FontClass::Serif, SIZE);
        assert!((narrow - wide).abs() < 1e-9);
    }

    #[test]
    fn test_wrap_fills_lines_greedily() {
        // room for exactly 11 narrow glyphs
        let width = char_width() * 11.0;
        let lines = wrap("the cat sat on the mat", width, FontClass::Serif, SIZE);
        assert_eq!(lines, vec!["the cat sat", "on the mat"]);
    }

    #[test]
    fn test_wrap_keeps_paragraph_gaps() {
        let lines = wrap("one\n\n\n\ntwo\n\n", 100.0, FontClass::Serif, SIZE);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let width = char_width() * 4.0;
        let lines = wrap("abcdefghij", width, FontClass::Serif, SIZE);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_zero_width_still_terminates() {
        let lines = wrap("abc", 0.0, FontClass::Serif, SIZE);
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_max_lines() {
        assert_eq!(max_lines(10.0, 5.0), 2);
        assert_eq!(max_lines(9.99, 5.0), 1);
        assert_eq!(max_lines(0.3 * 3.0, 0.3), 3);
        assert_eq!(max_lines(10.0, 0.0), 0);
    }

    #[test]
    fn test_flow_truncates_overflow() {
        let text = (1..=30)
            .map(|i| format!("line{}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let rect = BoxMm::new(0.0, 0.0, 100.0, 50.0);
        let result = flow(&text, &rect, FontClass::Serif, SIZE, 5.0);
        assert!(result.truncated);
        assert_eq!(result.lines.len(), 10);
        assert_eq!(result.lines[0], "line1");
        assert_eq!(result.lines[9], "line10");
    }

    #[test]
    fn test_flow_without_overflow() {
        let rect = BoxMm::new(0.0, 0.0, 100.0, 50.0);
        let result = flow("short", &rect, FontClass::Serif, SIZE, 5.0);
        assert!(!result.truncated);
        assert_eq!(result.lines, vec!["short"]);
    }

    #[test]
    fn test_flow_into_empty_box() {
        let rect = BoxMm::new(0.0, 0.0, 100.0, 0.0);
        let result = flow("anything", &rect, FontClass::Serif, SIZE, 5.0);
        assert!(result.truncated);
        assert!(result.lines.is_empty());
    }

    #[test]
    fn test_split_paragraphs() {
        let paragraphs = split_paragraphs("a\nb\n\nc\n \n\n d \n");
        assert_eq!(paragraphs, vec!["a\nb", "c", " d "]);
        assert!(split_paragraphs("\n\n").is_empty());
    }
}
