//! Character-cell rasteriser for the preview.
//!
//! Executes the shared display list onto a grid of terminal cells. At 100% zoom
//! one cell covers 4 x 8 mm, roughly the aspect of a terminal glyph.

use crate::models::DimensionProfile;
use crate::render::{Interpreter, RenderCommand, RenderPlan, RenderedPage, Rgb};
use crate::Result;

/// Cell width in millimetres at 100% zoom.
pub const CELL_WIDTH_MM: f64 = 4.0;
/// Cell height in millimetres at 100% zoom.
pub const CELL_HEIGHT_MM: f64 = 8.0;

const IMAGE_FILL: char = '░';
const IMAGE_TINT: Rgb = Rgb {
    r: 0x88,
    g: 0x88,
    b: 0x88,
};

/// One terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Rgb,
    pub bg: Rgb,
}

impl Cell {
    fn blank(bg: Rgb) -> Self {
        Self {
            ch: ' ',
            fg: Rgb::BLACK,
            bg,
        }
    }
}

/// A rasterised page.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterPage {
    pub page_number: u32,
    pub cols: usize,
    pub rows: usize,
    cells: Vec<Cell>,
}

impl RasterPage {
    fn new(page_number: u32, cols: usize, rows: usize) -> Self {
        Self {
            page_number,
            cols,
            rows,
            cells: vec![Cell::blank(Rgb::WHITE); cols * rows],
        }
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<&Cell> {
        if col < self.cols && row < self.rows {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    fn cell_mut(&mut self, col: usize, row: usize) -> Option<&mut Cell> {
        if col < self.cols && row < self.rows {
            self.cells.get_mut(row * self.cols + col)
        } else {
            None
        }
    }

    /// Cells of one row, left to right.
    pub fn row(&self, row: usize) -> &[Cell] {
        let start = (row * self.cols).min(self.cells.len());
        let end = (start + self.cols).min(self.cells.len());
        &self.cells[start..end]
    }

    /// The page as plain text, one line per row with trailing spaces trimmed.
    pub fn to_text(&self) -> String {
        (0..self.rows)
            .map(|r| {
                let line: String = self.row(r).iter().map(|c| c.ch).collect();
                line.trim_end().to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Interpreter that draws pages into character cells.
#[derive(Debug, Clone)]
pub struct PageCanvas {
    zoom: u16,
    pages: Vec<RasterPage>,
    trace: Vec<RenderedPage>,
}

impl PageCanvas {
    pub fn new(zoom: u16) -> Self {
        Self {
            zoom: zoom.max(1),
            pages: Vec::new(),
            trace: Vec::new(),
        }
    }

    fn scale(&self) -> f64 {
        f64::from(self.zoom) / 100.0
    }

    fn cell_width(&self) -> f64 {
        CELL_WIDTH_MM / self.scale()
    }

    fn cell_height(&self) -> f64 {
        CELL_HEIGHT_MM / self.scale()
    }

    /// Grid size of a page at this canvas' zoom.
    pub fn grid_size(&self, page: &DimensionProfile) -> (usize, usize) {
        let cols = (page.width_mm / self.cell_width()).round().max(1.0) as usize;
        let rows = (page.height_mm / self.cell_height()).round().max(1.0) as usize;
        (cols, rows)
    }

    fn col(&self, x_mm: f64) -> isize {
        (x_mm / self.cell_width()).floor() as isize
    }

    fn row(&self, y_mm: f64) -> isize {
        (y_mm / self.cell_height()).floor() as isize
    }

    /// Cell span covered by a box, clipped to the page.
    fn span(&self, raster: &RasterPage, x: f64, y: f64, w: f64, h: f64) -> (usize, usize, usize, usize) {
        let clip = |v: isize, max: usize| v.clamp(0, max as isize) as usize;
        let c0 = clip(self.col(x), raster.cols);
        let r0 = clip(self.row(y), raster.rows);
        let c1 = clip(((x + w) / self.cell_width()).ceil() as isize, raster.cols);
        let r1 = clip(((y + h) / self.cell_height()).ceil() as isize, raster.rows);
        (c0, r0, c1, r1)
    }

    fn execute(&self, raster: &mut RasterPage, command: &RenderCommand) {
        match command {
            RenderCommand::FillRect {
                x,
                y,
                width,
                height,
                color,
            } => {
                let bg = Rgb::parse(color).unwrap_or(Rgb::WHITE);
                let (c0, r0, c1, r1) = self.span(raster, *x, *y, *width, *height);
                for row in r0..r1 {
                    for col in c0..c1 {
                        if let Some(cell) = raster.cell_mut(col, row) {
                            *cell = Cell::blank(bg);
                        }
                    }
                }
            }
            RenderCommand::Image {
                x,
                y,
                width,
                height,
                ..
            } => {
                let (c0, r0, c1, r1) = self.span(raster, *x, *y, *width, *height);
                for row in r0..r1 {
                    for col in c0..c1 {
                        if let Some(cell) = raster.cell_mut(col, row) {
                            cell.ch = IMAGE_FILL;
                            cell.fg = IMAGE_TINT;
                        }
                    }
                }
            }
            RenderCommand::Text { x, y, text, color, .. } => {
                let fg = Rgb::parse(color).unwrap_or(Rgb::BLACK);
                let row = self.row(*y);
                if row < 0 {
                    return;
                }
                let mut col = self.col(*x).max(0) as usize;
                for ch in text.chars() {
                    match raster.cell_mut(col, row as usize) {
                        Some(cell) => {
                            cell.ch = ch;
                            cell.fg = fg;
                        }
                        None => break,
                    }
                    col += 1;
                }
            }
        }
    }

    /// Rasterised pages in draw order.
    pub fn pages(&self) -> &[RasterPage] {
        &self.pages
    }

    pub fn zoom(&self) -> u16 {
        self.zoom
    }
}

impl Interpreter for PageCanvas {
    fn draw_page(&mut self, plan: &RenderPlan, commands: &[RenderCommand]) -> Result<()> {
        let (cols, rows) = self.grid_size(&plan.page);
        let mut raster = RasterPage::new(plan.page_number, cols, rows);
        let mut trace = RenderedPage::new(plan);
        for command in commands {
            self.execute(&mut raster, command);
            trace.record(command);
        }
        self.pages.push(raster);
        self.trace.push(trace);
        Ok(())
    }

    fn trace(&self) -> &[RenderedPage] {
        &self.trace
    }
}
