//! The renderer-agnostic description of one laid-out page.
//!
//! A [`RenderPlan`] is pure data: boxes in millimetres measured from the page's
//! top-left corner, the text that goes in them (already wrapped) and the images
//! that fill them. Interpreters never make layout decisions of their own.

use serde::{Deserialize, Serialize};

use super::flow::FontClass;
use crate::models::{DimensionProfile, PageLayout, PageType};

/// An axis-aligned box in millimetres, origin top-left, y growing downwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxMm {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxMm {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True if `other` lies entirely within this box (with a small tolerance).
    pub fn contains(&self, other: &BoxMm) -> bool {
        const EPS: f64 = 1e-6;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }
}

/// What a text block is for. Interpreters may use this for emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    Title,
    Subtitle,
    Author,
    Body,
    Info,
    Barcode,
    PageNumber,
}

/// Horizontal alignment of each line within its box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A box of wrapped text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub role: TextRole,
    #[serde(rename = "box")]
    pub rect: BoxMm,
    pub font: FontClass,
    pub font_size_pt: f64,
    /// Distance between baselines
    pub line_height_mm: f64,
    pub align: TextAlign,
    /// Lines exactly as they will be drawn
    pub lines: Vec<String>,
    /// True if text was dropped because it did not fit
    pub truncated: bool,
    /// Paragraph blocks this box was built from (two-column layouts)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paragraphs: Vec<String>,
}

/// A box an image is stretched into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSlot {
    pub uri: String,
    #[serde(rename = "box")]
    pub rect: BoxMm,
}

/// Full layout of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPlan {
    pub page_number: u32,
    pub page_type: PageType,
    pub variant: PageLayout,
    pub page: DimensionProfile,
    /// Content area inside the margins
    pub content_box: BoxMm,
    pub images: Vec<ImageSlot>,
    pub blocks: Vec<TextBlock>,
}

impl RenderPlan {
    /// The first block with a given role.
    pub fn block(&self, role: TextRole) -> Option<&TextBlock> {
        self.blocks.iter().find(|b| b.role == role)
    }

    /// All blocks with a given role, in plan order.
    pub fn blocks_with(&self, role: TextRole) -> impl Iterator<Item = &TextBlock> {
        self.blocks.iter().filter(move |b| b.role == role)
    }

    pub fn page_number_block(&self) -> Option<&TextBlock> {
        self.block(TextRole::PageNumber)
    }

    /// True if any block lost text to overflow.
    pub fn truncated(&self) -> bool {
        self.blocks.iter().any(|b| b.truncated)
    }

    /// Every drawn line, in plan order.
    pub fn lines(&self) -> Vec<String> {
        self.blocks
            .iter()
            .flat_map(|b| b.lines.iter().cloned())
            .collect()
    }
}
