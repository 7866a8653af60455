//! Display list shared by every interpreter.
//!
//! [`lower`] turns a plan plus its style into an ordered list of
//! [`RenderCommand`]s. Interpreters only execute commands; line positions and
//! alignment are decided here once.

use serde::{Deserialize, Serialize};

use super::flow::{FontClass, text_width_mm};
use super::plan::{RenderPlan, TextAlign, TextRole};
use super::theme::EffectiveStyle;
use crate::Result;
use crate::models::{PageLayout, pt_to_mm};

/// Fraction of the font size from the top of a line box to its baseline.
pub const ASCENT: f64 = 0.8;

/// A drawing command in page millimetres, origin top-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RenderCommand {
    /// Fill a rectangle with a solid colour
    FillRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
    },
    /// Draw one line of text; `y` is the baseline
    Text {
        x: f64,
        y: f64,
        text: String,
        color: String,
        font: FontClass,
        font_size_pt: f64,
        role: TextRole,
    },
    /// Stretch an image into a box
    Image {
        uri: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

/// Build the display list for one page.
pub fn lower(plan: &RenderPlan, style: &EffectiveStyle) -> Vec<RenderCommand> {
    let mut commands = Vec::new();

    if style.has_background() {
        commands.push(RenderCommand::FillRect {
            x: 0.0,
            y: 0.0,
            width: plan.page.width_mm,
            height: plan.page.height_mm,
            color: style.background_color.clone(),
        });
    }

    for image in &plan.images {
        commands.push(RenderCommand::Image {
            uri: image.uri.clone(),
            x: image.rect.x,
            y: image.rect.y,
            width: image.rect.width,
            height: image.rect.height,
        });
    }

    for block in &plan.blocks {
        let ascent = pt_to_mm(block.font_size_pt) * ASCENT;
        for (i, line) in block.lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let width = text_width_mm(line, block.font, block.font_size_pt);
            let x = match block.align {
                TextAlign::Left => block.rect.x,
                TextAlign::Center => block.rect.x + (block.rect.width - width) / 2.0,
                TextAlign::Right => block.rect.right() - width,
            };
            commands.push(RenderCommand::Text {
                x,
                y: block.rect.y + i as f64 * block.line_height_mm + ascent,
                text: line.clone(),
                color: style.text_color.clone(),
                font: block.font,
                font_size_pt: block.font_size_pt,
                role: block.role,
            });
        }
    }

    commands
}

/// What an interpreter actually drew for one page.
///
/// Two interpreters fed the same plans must produce equal traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedPage {
    pub page_number: u32,
    pub variant: PageLayout,
    pub width_mm: f64,
    pub height_mm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    pub lines: Vec<String>,
    pub images: Vec<String>,
}

impl RenderedPage {
    pub fn new(plan: &RenderPlan) -> Self {
        Self {
            page_number: plan.page_number,
            variant: plan.variant,
            width_mm: plan.page.width_mm,
            height_mm: plan.page.height_mm,
            background: None,
            lines: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Note a command as drawn.
    pub fn record(&mut self, command: &RenderCommand) {
        match command {
            RenderCommand::FillRect { color, .. } => self.background = Some(color.clone()),
            RenderCommand::Text { text, .. } => self.lines.push(text.clone()),
            RenderCommand::Image { uri, .. } => self.images.push(uri.clone()),
        }
    }
}

/// A backend that executes display lists.
pub trait Interpreter {
    /// Draw one page. Pages arrive in page-number order.
    fn draw_page(&mut self, plan: &RenderPlan, commands: &[RenderCommand]) -> Result<()>;

    /// Pages drawn so far.
    fn trace(&self) -> &[RenderedPage];
}
