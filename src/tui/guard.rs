//! Terminal state guard.
//!
//! Raw mode and the alternate screen must be undone on every exit path,
//! including panics and fatal connection errors.

use std::io;

use anyhow::Result;
use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};

/// Restores the terminal when dropped.
///
/// # Example
///
/// ```ignore
/// let _guard = TerminalGuard::enter()?;
/// // draw until quit; the terminal is restored when `_guard` drops
/// ```
#[derive(Debug)]
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    /// Enables raw mode and switches to the alternate screen.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal refuses either mode change. Raw mode
    /// is undone before returning in that case.
    pub fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let guard = Self { _private: () };
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore();
    }
}

/// Best-effort terminal restore. Safe to call more than once.
pub fn restore() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
}
