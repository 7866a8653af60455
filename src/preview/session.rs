//! Preview state machine.
//!
//! Holds the navigation, zoom and view-mode state of an interactive preview.
//! Every navigation event re-resolves and re-lays-out the pages that become
//! visible; nothing is cached across page changes.

use std::sync::Arc;

use serde::Serialize;

use super::canvas::PageCanvas;
use crate::models::{Book, ThemeCatalog};
use crate::render::{self, Interpreter, LayoutEngine, PlannedPage};
use crate::Result;

/// Smallest zoom level, in percent.
pub const MIN_ZOOM: u16 = 25;
/// Largest zoom level, in percent.
pub const MAX_ZOOM: u16 = 200;
/// Zoom increment, in percent.
pub const ZOOM_STEP: u16 = 25;
/// Zoom level restored by reset.
pub const DEFAULT_ZOOM: u16 = 100;

/// How many pages are shown at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Single,
    /// Facing pages: the first page alone, then 2-3, 4-5, ...
    Spread,
}

/// Input to the preview, independent of the terminal key that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewAction {
    Next,
    Previous,
    First,
    Last,
    /// Jump to a page by its page number
    GoTo(u32),
    ZoomIn,
    ZoomOut,
    ZoomReset,
    ToggleFullscreen,
    ToggleThumbnails,
    ToggleSpread,
    Quit,
}

/// A live preview of one book.
pub struct PreviewSession {
    book: Arc<Book>,
    catalog: Arc<ThemeCatalog>,
    engine: LayoutEngine,
    /// Index into `book.pages` of the first visible page
    current: usize,
    zoom: u16,
    mode: ViewMode,
    fullscreen: bool,
    thumbnails: bool,
    quit: bool,
    visible: Vec<PlannedPage>,
    rebuilds: u64,
}

impl PreviewSession {
    /// Open a preview on the first page.
    pub fn new(book: Arc<Book>, catalog: Arc<ThemeCatalog>, engine: LayoutEngine) -> Self {
        let mut session = Self {
            book,
            catalog,
            engine,
            current: 0,
            zoom: DEFAULT_ZOOM,
            mode: ViewMode::Single,
            fullscreen: false,
            thumbnails: false,
            quit: false,
            visible: Vec::new(),
            rebuilds: 0,
        };
        session.rebuild();
        session
    }

    /// Start at a zoom level other than 100%. The value is clamped and snapped
    /// to the zoom step.
    pub fn with_zoom(mut self, zoom: u16) -> Self {
        let snapped = zoom.clamp(MIN_ZOOM, MAX_ZOOM) / ZOOM_STEP * ZOOM_STEP;
        self.zoom = snapped;
        self
    }

    /// Apply an action. Returns true if anything changed.
    pub fn apply(&mut self, action: PreviewAction) -> bool {
        match action {
            PreviewAction::Next => self.navigate(self.next_index()),
            PreviewAction::Previous => self.navigate(self.previous_index()),
            PreviewAction::First => self.navigate(Some(0)),
            PreviewAction::Last => {
                let last = self.book.pages.len().saturating_sub(1);
                self.navigate(Some(self.align(last)))
            }
            PreviewAction::GoTo(page_number) => {
                let target = self
                    .book
                    .pages
                    .iter()
                    .position(|p| p.page_number == page_number)
                    .map(|i| self.align(i));
                if target.is_none() {
                    tracing::debug!(page_number, "no such page, ignoring jump");
                }
                self.navigate(target)
            }
            PreviewAction::ZoomIn => self.set_zoom(self.zoom.saturating_add(ZOOM_STEP)),
            PreviewAction::ZoomOut => self.set_zoom(self.zoom.saturating_sub(ZOOM_STEP)),
            PreviewAction::ZoomReset => self.set_zoom(DEFAULT_ZOOM),
            PreviewAction::ToggleFullscreen => {
                self.fullscreen = !self.fullscreen;
                true
            }
            PreviewAction::ToggleThumbnails => {
                self.thumbnails = !self.thumbnails;
                true
            }
            PreviewAction::ToggleSpread => {
                self.mode = match self.mode {
                    ViewMode::Single => ViewMode::Spread,
                    ViewMode::Spread => ViewMode::Single,
                };
                self.current = self.align(self.current);
                self.rebuild();
                true
            }
            PreviewAction::Quit => {
                self.quit = true;
                true
            }
        }
    }

    fn navigate(&mut self, target: Option<usize>) -> bool {
        match target {
            Some(index) if index != self.current => {
                self.current = index;
                self.rebuild();
                true
            }
            _ => false,
        }
    }

    fn set_zoom(&mut self, zoom: u16) -> bool {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let changed = zoom != self.zoom;
        self.zoom = zoom;
        changed
    }

    /// First index of the view containing `index`.
    fn align(&self, index: usize) -> usize {
        match self.mode {
            ViewMode::Single => index,
            ViewMode::Spread if index == 0 => 0,
            ViewMode::Spread if index % 2 == 1 => index,
            ViewMode::Spread => index - 1,
        }
    }

    fn next_index(&self) -> Option<usize> {
        let next = match self.mode {
            ViewMode::Single => self.current + 1,
            ViewMode::Spread if self.current == 0 => 1,
            ViewMode::Spread => self.current + 2,
        };
        (next < self.book.pages.len()).then_some(next)
    }

    fn previous_index(&self) -> Option<usize> {
        match (self.mode, self.current) {
            (_, 0) => None,
            (ViewMode::Spread, 1) => Some(0),
            (ViewMode::Spread, current) => Some(current - 2),
            (ViewMode::Single, current) => Some(current - 1),
        }
    }

    /// Indices of the pages currently in view.
    pub fn visible_indices(&self) -> Vec<usize> {
        let mut indices = vec![self.current];
        if self.mode == ViewMode::Spread
            && self.current != 0
            && self.current + 1 < self.book.pages.len()
        {
            indices.push(self.current + 1);
        }
        indices
    }

    fn rebuild(&mut self) {
        self.visible = self
            .visible_indices()
            .into_iter()
            .filter_map(|i| self.book.pages.get(i))
            .map(|page| render::plan_page(page, &self.book, &self.catalog, &self.engine))
            .collect();
        self.rebuilds += 1;
        tracing::debug!(
            page_index = self.current,
            visible = self.visible.len(),
            "rebuilt preview plans"
        );
    }

    /// Rasterise the visible pages at the current zoom.
    pub fn render(&self) -> Result<PageCanvas> {
        let mut canvas = PageCanvas::new(self.zoom);
        render::draw_all(&mut canvas, &self.visible)?;
        Ok(canvas)
    }

    /// Plans for the pages in view.
    pub fn visible(&self) -> &[PlannedPage] {
        &self.visible
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    /// 0-based index of the first visible page.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_page_number(&self) -> u32 {
        self.book
            .pages
            .get(self.current)
            .map(|p| p.page_number)
            .unwrap_or(0)
    }

    pub fn page_count(&self) -> usize {
        self.book.pages.len()
    }

    pub fn zoom(&self) -> u16 {
        self.zoom
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn shows_thumbnails(&self) -> bool {
        self.thumbnails
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Number of times the visible plans were rebuilt.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// One entry per page, true for pages in view.
    pub fn indicator(&self) -> Vec<bool> {
        let visible = self.visible_indices();
        (0..self.book.pages.len())
            .map(|i| visible.contains(&i))
            .collect()
    }

    /// Draw the visible set into any interpreter, for callers that want a trace
    /// without rasterising.
    pub fn draw_into<I: Interpreter + ?Sized>(&self, interpreter: &mut I) -> Result<()> {
        render::draw_all(interpreter, &self.visible)
    }
}
