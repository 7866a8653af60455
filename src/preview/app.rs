//! Terminal preview - event loop and terminal management
//!
//! Draws the active page (or spread) from the session's canvas, with a title
//! bar carrying the page indicator, an optional thumbnail rail and a status bar
//! listing the key bindings. Fullscreen hides everything but the page.

use std::io::{self, stdout};
use std::time::Duration;

use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use super::canvas::{PageCanvas, RasterPage};
use super::session::{PreviewAction, PreviewSession, ViewMode};
use crate::Result;
use crate::render::Rgb;

/// Width of the thumbnail rail, in columns.
const RAIL_WIDTH: u16 = 16;

/// Map a key to a preview action.
pub fn action_for(key: KeyCode) -> Option<PreviewAction> {
    match key {
        KeyCode::Right | KeyCode::Char(' ') => Some(PreviewAction::Next),
        KeyCode::Left => Some(PreviewAction::Previous),
        KeyCode::Home => Some(PreviewAction::First),
        KeyCode::End => Some(PreviewAction::Last),
        KeyCode::Char('f') => Some(PreviewAction::ToggleFullscreen),
        KeyCode::Char('t') => Some(PreviewAction::ToggleThumbnails),
        KeyCode::Char('s') => Some(PreviewAction::ToggleSpread),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(PreviewAction::ZoomIn),
        KeyCode::Char('-') => Some(PreviewAction::ZoomOut),
        KeyCode::Char('0') => Some(PreviewAction::ZoomReset),
        KeyCode::Char('q') | KeyCode::Esc => Some(PreviewAction::Quit),
        _ => None,
    }
}

/// Terminal front end for a preview session.
pub struct PreviewApp {
    session: PreviewSession,
    /// Raster of the visible pages, refreshed after every state change
    canvas: PageCanvas,
    /// Digits typed so far for a jump (`12g` goes to page 12)
    pending_jump: String,
}

impl PreviewApp {
    pub fn new(session: PreviewSession) -> Result<Self> {
        let canvas = session.render()?;
        Ok(Self {
            session,
            canvas,
            pending_jump: String::new(),
        })
    }

    /// Handle keyboard events
    fn handle_key(&mut self, key: KeyCode) -> Result<()> {
        if let KeyCode::Char(c @ '1'..='9') = key {
            self.pending_jump.push(c);
            return Ok(());
        }
        if let KeyCode::Char(c @ '0') = key
            && !self.pending_jump.is_empty()
        {
            self.pending_jump.push(c);
            return Ok(());
        }

        let action = match key {
            KeyCode::Char('g') | KeyCode::Enter if !self.pending_jump.is_empty() => {
                let target = self.pending_jump.parse().ok().map(PreviewAction::GoTo);
                self.pending_jump.clear();
                target
            }
            _ => {
                self.pending_jump.clear();
                action_for(key)
            }
        };

        if let Some(action) = action
            && self.session.apply(action)
        {
            self.canvas = self.session.render()?;
        }
        Ok(())
    }

    /// Render the UI
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        if self.session.is_fullscreen() {
            self.render_pages(frame, area);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title bar
                Constraint::Min(5),    // Pages
                Constraint::Length(3), // Status bar
            ])
            .split(area);

        self.render_title_bar(frame, chunks[0]);

        if self.session.shows_thumbnails() {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(RAIL_WIDTH), Constraint::Min(10)])
                .split(chunks[1]);
            self.render_rail(frame, columns[0]);
            self.render_pages(frame, columns[1]);
        } else {
            self.render_pages(frame, chunks[1]);
        }

        self.render_status_bar(frame, chunks[2]);
    }

    /// Title bar with the book title, page indicator dots and zoom
    fn render_title_bar(&self, frame: &mut Frame, area: Rect) {
        let book = self.session.book();
        let dots: String = self
            .session
            .indicator()
            .iter()
            .map(|on| if *on { '●' } else { '○' })
            .collect();
        let mode = match self.session.mode() {
            ViewMode::Single => "single",
            ViewMode::Spread => "spread",
        };
        let title = Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" {} ", book.title),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "| page {}/{} {} ",
                self.session.current_page_number(),
                self.session.page_count(),
                dots
            )),
            Span::styled(
                format!("| {}% {}", self.session.zoom(), mode),
                Style::default().fg(Color::DarkGray),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, area);
    }

    fn render_rail(&self, frame: &mut Frame, area: Rect) {
        let visible = self.session.visible_indices();
        let lines: Vec<Line> = self
            .session
            .book()
            .pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                let label = format!(" {:>3} {}", page.page_number, page.layout());
                if visible.contains(&i) {
                    Line::styled(label, Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    Line::raw(label)
                }
            })
            .collect();
        let rail = Paragraph::new(lines).block(Block::default().borders(Borders::RIGHT));
        frame.render_widget(rail, area);
    }

    fn render_pages(&self, frame: &mut Frame, area: Rect) {
        let pages = self.canvas.pages();
        if pages.is_empty() {
            return;
        }
        let constraints: Vec<Constraint> = pages
            .iter()
            .map(|p| Constraint::Length(p.cols as u16 + 1))
            .collect();
        let slots = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);
        for (page, slot) in pages.iter().zip(slots.iter()) {
            frame.render_widget(Paragraph::new(raster_lines(page)), *slot);
        }
    }

    /// Status bar with keybindings
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let status = Paragraph::new(
            " ←/→/Space:Page  Home/End  Ng:Jump  +/-/0:Zoom  s:Spread  t:Thumbs  f:Full  q:Quit",
        )
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(status, area);
    }
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

fn raster_lines(page: &RasterPage) -> Vec<Line<'static>> {
    (0..page.rows)
        .map(|r| {
            let spans: Vec<Span> = page
                .row(r)
                .iter()
                .map(|cell| {
                    Span::styled(
                        cell.ch.to_string(),
                        Style::default().fg(color(cell.fg)).bg(color(cell.bg)),
                    )
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// Setup the terminal for preview mode
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

/// Restore the terminal to normal mode
fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Run the interactive preview until the user quits.
pub fn run_preview(session: PreviewSession) -> Result<()> {
    let mut app = PreviewApp::new(session)?;
    let mut terminal = setup_terminal()?;
    let outcome = event_loop(&mut terminal, &mut app);
    restore_terminal()?;
    outcome
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut PreviewApp,
) -> Result<()> {
    loop {
        terminal.draw(|f| app.render(f))?;

        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.handle_key(key.code)?;
        }

        if app.session.should_quit() {
            tracing::info!("preview closed");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, BookInput, PageInput, ThemeCatalog};
    use crate::render::{Interpreter, LayoutEngine};
    use std::sync::Arc;

    fn app(pages: usize) -> PreviewApp {
        let inputs = (0..pages).map(|_| PageInput::new("content", "text")).collect();
        let book = Book::from_input(BookInput::new("Keys", "A").with_pages(inputs)).unwrap();
        let session = PreviewSession::new(
            Arc::new(book),
            Arc::new(ThemeCatalog::new()),
            LayoutEngine::default(),
        );
        PreviewApp::new(session).unwrap()
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(action_for(KeyCode::Right), Some(PreviewAction::Next));
        assert_eq!(action_for(KeyCode::Char(' ')), Some(PreviewAction::Next));
        assert_eq!(action_for(KeyCode::Left), Some(PreviewAction::Previous));
        assert_eq!(action_for(KeyCode::Char('f')), Some(PreviewAction::ToggleFullscreen));
        assert_eq!(action_for(KeyCode::Char('t')), Some(PreviewAction::ToggleThumbnails));
        assert_eq!(action_for(KeyCode::Char('+')), Some(PreviewAction::ZoomIn));
        assert_eq!(action_for(KeyCode::Char('-')), Some(PreviewAction::ZoomOut));
        assert_eq!(action_for(KeyCode::Char('0')), Some(PreviewAction::ZoomReset));
        assert_eq!(action_for(KeyCode::Esc), Some(PreviewAction::Quit));
        assert_eq!(action_for(KeyCode::Char('x')), None);
    }

    #[test]
    fn test_arrow_keys_redraw_canvas() {
        let mut app = app(3);
        app.handle_key(KeyCode::Right).unwrap();
        assert_eq!(app.session.current_page_number(), 2);
        assert_eq!(app.canvas.trace()[0].page_number, 2);
    }

    #[test]
    fn test_typed_jump() {
        let mut app = app(12);
        for key in ['1', '0', 'g'] {
            app.handle_key(KeyCode::Char(key)).unwrap();
        }
        assert_eq!(app.session.current_page_number(), 10);
        // a lone 0 still resets zoom
        app.handle_key(KeyCode::Char('+')).unwrap();
        app.handle_key(KeyCode::Char('0')).unwrap();
        assert_eq!(app.session.zoom(), 100);
    }

    #[test]
    fn test_quit_key() {
        let mut app = app(1);
        app.handle_key(KeyCode::Char('q')).unwrap();
        assert!(app.session.should_quit());
    }
}
