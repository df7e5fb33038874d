//! TUI rendering.
//!
//! Rendering is decoupled from the runner via [`RenderContext`]:
//!
//! ```text
//! TuiRunner ──builds──> RenderContext ──passed to──> render()
//! ```
//!
//! # Layout
//!
//! ```text
//! ┌ Character ─┐┌ Chat ──────────────────┐
//! │ name       ││ history                │
//! │     HP: n  ││┌──────────────────────┐│
//! │            │││ input                ││
//! │            ││└──────────────────────┘│
//! │            │└────────────────────────┘
//! │            │┌ System ────────────────┐
//! │            ││ notices                │
//! └────────────┘└────────────────────────┘
//!  title | stage | version
//! ```
//!
//! When the debug window is focused it replaces everything above the status
//! bar.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tui_input::Input;

use crate::app::{App, Focus, Panels};
use crate::constants;
use crate::session::Stage;

/// Everything the renderer reads.
#[derive(Debug)]
pub struct RenderContext<'a> {
    /// Status bar title.
    pub title: &'a str,
    /// Lifecycle stage for the status bar.
    pub stage: Stage,
    /// Focused panel.
    pub focus: Focus,
    /// Panel buffers.
    pub panels: &'a Panels,
    /// Chat input line.
    pub chat_input: &'a Input,
    /// Whether the retry prompt is open.
    pub retry_pending: bool,
}

impl<'a> RenderContext<'a> {
    /// Snapshot of the app for one frame.
    pub fn from_app(app: &'a App) -> Self {
        Self {
            title: &app.title,
            stage: app.session.stage(),
            focus: app.focus,
            panels: &app.panels,
            chat_input: &app.chat_input,
            retry_pending: app.retry_pending,
        }
    }
}

/// Draws one frame.
pub fn render(frame: &mut Frame, ctx: &RenderContext) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    if ctx.focus.is_full_screen() {
        render_history(frame, rows[0], " Debug ", ctx.panels.debug(), true);
    } else {
        render_main(frame, rows[0], ctx);
    }
    render_status_bar(frame, rows[1], ctx);
}

fn render_main(frame: &mut Frame, area: Rect, ctx: &RenderContext) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(constants::CHARACTER_PANEL_WIDTH_PERCENT),
            Constraint::Percentage(100 - constants::CHARACTER_PANEL_WIDTH_PERCENT),
        ])
        .split(area);

    let character = Paragraph::new(ctx.panels.character())
        .block(panel_block(" Character ", ctx.focus == Focus::Character));
    frame.render_widget(character, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(constants::CHAT_PANEL_HEIGHT_PERCENT),
            Constraint::Percentage(100 - constants::CHAT_PANEL_HEIGHT_PERCENT),
        ])
        .split(columns[1]);

    render_chat(frame, right[0], ctx);
    render_history(
        frame,
        right[1],
        " System ",
        ctx.panels.system(),
        ctx.focus == Focus::System,
    );
}

fn render_chat(frame: &mut Frame, area: Rect, ctx: &RenderContext) {
    let focused = ctx.focus == Focus::Chat;
    let block = panel_block(" Chat ", focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(inner);

    let history = ctx.panels.chat();
    frame.render_widget(
        Paragraph::new(tail_lines(history, parts[0].height)),
        parts[0],
    );

    let input_block = Block::default().borders(Borders::ALL);
    let input_area = input_block.inner(parts[1]);
    let width = usize::from(input_area.width.max(1));
    let scroll = ctx.chat_input.visual_scroll(width.saturating_sub(1));
    let input = Paragraph::new(ctx.chat_input.value())
        .scroll((0, u16::try_from(scroll).unwrap_or(u16::MAX)))
        .block(input_block);
    frame.render_widget(input, parts[1]);

    if focused {
        let offset = ctx.chat_input.visual_cursor().saturating_sub(scroll);
        let x = input_area
            .x
            .saturating_add(u16::try_from(offset).unwrap_or(u16::MAX));
        frame.set_cursor_position((x, input_area.y));
    }
}

fn render_history(frame: &mut Frame, area: Rect, title: &str, lines: &[String], focused: bool) {
    let block = panel_block(title, focused);
    let height = block.inner(area).height;
    frame.render_widget(Paragraph::new(tail_lines(lines, height)).block(block), area);
}

fn render_status_bar(frame: &mut Frame, area: Rect, ctx: &RenderContext) {
    let hint = if ctx.retry_pending {
        "Retry? (Y/N)"
    } else {
        "F2 Chat  F3 System  F4 Character  F5 Debug  ^Q Quit"
    };
    let text = format!(
        " {} | {} | v{} | {}",
        ctx.title,
        ctx.stage.status_text(),
        constants::VERSION,
        hint
    );
    let bar = Paragraph::new(text).style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_widget(bar, area);
}

fn panel_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

/// The last `height` lines, so histories stay scrolled to the bottom.
fn tail_lines(lines: &[String], height: u16) -> Vec<Line<'_>> {
    let skip = lines.len().saturating_sub(usize::from(height));
    lines[skip..]
        .iter()
        .map(|line| Line::from(line.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use ratatui::{backend::TestBackend, Terminal};

    use super::*;

    fn draw(ctx: &RenderContext) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| render(frame, ctx)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_main_view_shows_panels_and_status() {
        let mut panels = Panels::new();
        panels.push_system("Login rejected: invalid_credentials");
        let input = Input::default().with_value("/login".to_string());
        let ctx = RenderContext {
            title: constants::DEFAULT_TITLE,
            stage: Stage::Ready,
            focus: Focus::Chat,
            panels: &panels,
            chat_input: &input,
            retry_pending: false,
        };

        let screen = draw(&ctx);
        assert!(screen.contains(constants::CHARACTER_PLACEHOLDER));
        assert!(screen.contains("Login rejected: invalid_credentials"));
        assert!(screen.contains("/login"));
        assert!(screen.contains(constants::DEFAULT_TITLE));
        assert!(screen.contains("Ready"));
    }

    #[test]
    fn test_debug_focus_is_full_screen() {
        let mut panels = Panels::new();
        panels.push_debug(constants::RETRY_PROMPT);
        let input = Input::default();
        let ctx = RenderContext {
            title: constants::DEFAULT_TITLE,
            stage: Stage::Connecting,
            focus: Focus::Debug,
            panels: &panels,
            chat_input: &input,
            retry_pending: true,
        };

        let screen = draw(&ctx);
        assert!(screen.contains(constants::CONNECTING_MESSAGE));
        assert!(screen.contains(constants::RETRY_PROMPT));
        assert!(!screen.contains(constants::CHARACTER_PLACEHOLDER));
    }

    #[test]
    fn test_tail_lines_keeps_newest() {
        let lines: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        let tail = tail_lines(&lines, 2);
        assert_eq!(tail, vec![Line::from("3"), Line::from("4")]);
        assert_eq!(tail_lines(&lines, 10).len(), 5);
    }
}
