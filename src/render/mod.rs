//! Shared rendering pipeline.
//!
//! Everything both interpreters depend on lives here, so there is exactly one
//! place that decides what a page looks like.
//!
//! # Modules
//!
//! - `theme`: Theme cascade and the resolved page style
//! - `flow`: Font metrics, word wrap and overflow handling
//! - `layout`: The layout engine and its settings
//! - `plan`: The render plan data model
//! - `commands`: Display-list lowering and the interpreter trait

pub mod commands;
pub mod flow;
pub mod layout;
pub mod plan;
pub mod theme;

pub use commands::{Interpreter, RenderCommand, RenderedPage, lower};
pub use flow::FontClass;
pub use layout::{LayoutEngine, LayoutSettings};
pub use plan::{BoxMm, ImageSlot, RenderPlan, TextAlign, TextBlock, TextRole};
pub use theme::{EffectiveStyle, Rgb};

use serde::Serialize;

use crate::models::{Book, Page, ThemeCatalog};

/// A page ready for any interpreter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedPage {
    pub plan: RenderPlan,
    pub style: EffectiveStyle,
    pub commands: Vec<RenderCommand>,
}

/// Resolve, lay out and lower one page.
pub fn plan_page(
    page: &Page,
    book: &Book,
    catalog: &ThemeCatalog,
    engine: &LayoutEngine,
) -> PlannedPage {
    let style = theme::resolve(page, book, catalog);
    let plan = engine.layout(page, &book.profile(), &style);
    let commands = lower(&plan, &style);
    PlannedPage {
        plan,
        style,
        commands,
    }
}

/// Plan every page of a book in page order.
pub fn plan_book(book: &Book, catalog: &ThemeCatalog, engine: &LayoutEngine) -> Vec<PlannedPage> {
    book.pages
        .iter()
        .map(|page| plan_page(page, book, catalog, engine))
        .collect()
}

/// Feed planned pages to an interpreter in order.
pub fn draw_all<I: Interpreter + ?Sized>(
    interpreter: &mut I,
    pages: &[PlannedPage],
) -> crate::Result<()> {
    for page in pages {
        interpreter.draw_page(&page.plan, &page.commands)?;
    }
    Ok(())
}
