//! Keyboard input handling for the dreamer TUI.
//!
//! Translates crossterm key events into [`InputAction`]s based on the
//! focused panel and whether a retry prompt is open. The host applies the
//! action; nothing here touches application state.
//!
//! # Overview
//!
//! - **Universal**: `F2`-`F5` move focus, `Ctrl+Q` quits, `Ctrl+D` dumps
//!   input state to the debug window
//! - **Debug + retry prompt**: `y` retries, `n` quits
//! - **Chat**: text editing and `Enter` to submit

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tui_input::InputRequest;

use super::Focus;

/// Editing operation on the chat input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// Insert a character at the cursor.
    Insert(char),
    /// Delete the character before the cursor.
    Backspace,
    /// Delete the character under the cursor.
    Delete,
    /// Move the cursor one character left.
    Left,
    /// Move the cursor one character right.
    Right,
    /// Move the cursor to the start of the line.
    Home,
    /// Move the cursor to the end of the line.
    End,
    /// Delete the word before the cursor.
    DeleteWord,
}

impl EditAction {
    /// The equivalent `tui-input` request.
    pub fn to_request(self) -> InputRequest {
        match self {
            Self::Insert(c) => InputRequest::InsertChar(c),
            Self::Backspace => InputRequest::DeletePrevChar,
            Self::Delete => InputRequest::DeleteNextChar,
            Self::Left => InputRequest::GoToPrevChar,
            Self::Right => InputRequest::GoToNextChar,
            Self::Home => InputRequest::GoToStart,
            Self::End => InputRequest::GoToEnd,
            Self::DeleteWord => InputRequest::DeletePrevWord,
        }
    }
}

/// Result of handling a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// No action needed.
    None,
    /// Request application quit.
    Quit,
    /// Move keyboard focus.
    Focus(Focus),
    /// Append the chat input state to the debug window.
    DumpState,
    /// Submit the chat input line.
    Submit,
    /// Edit the chat input line.
    Edit(EditAction),
    /// User accepted the retry prompt.
    RetryAccept,
    /// User declined the retry prompt.
    RetryDecline,
}

/// Handles a key event.
///
/// # Arguments
///
/// * `key` - The key event from crossterm
/// * `focus` - The currently focused panel
/// * `retry_pending` - Whether the retry prompt is open
pub fn handle_key(key: KeyEvent, focus: Focus, retry_pending: bool) -> InputAction {
    if key.kind == KeyEventKind::Release {
        return InputAction::None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::F(2) => return InputAction::Focus(Focus::Chat),
        KeyCode::F(3) => return InputAction::Focus(Focus::System),
        KeyCode::F(4) => return InputAction::Focus(Focus::Character),
        KeyCode::F(5) => return InputAction::Focus(Focus::Debug),
        KeyCode::Char('q') if ctrl => return InputAction::Quit,
        KeyCode::Char('d') if ctrl => return InputAction::DumpState,
        _ => {}
    }

    if focus == Focus::Debug && retry_pending {
        handle_retry_key(key.code)
    } else if focus.accepts_text_input() {
        handle_chat_key(key.code, key.modifiers)
    } else {
        InputAction::None
    }
}

/// Handles key input while the retry prompt is open.
pub fn handle_retry_key(code: KeyCode) -> InputAction {
    match code {
        KeyCode::Char('y' | 'Y') => InputAction::RetryAccept,
        KeyCode::Char('n' | 'N') => InputAction::RetryDecline,
        _ => InputAction::None,
    }
}

/// Handles key input in the chat panel.
pub fn handle_chat_key(code: KeyCode, modifiers: KeyModifiers) -> InputAction {
    match code {
        KeyCode::Enter => InputAction::Submit,
        KeyCode::Char('w') if modifiers.contains(KeyModifiers::CONTROL) => {
            InputAction::Edit(EditAction::DeleteWord)
        }
        KeyCode::Char(_) if modifiers.contains(KeyModifiers::CONTROL) => InputAction::None,
        KeyCode::Char(c) => InputAction::Edit(EditAction::Insert(c)),
        KeyCode::Backspace => InputAction::Edit(EditAction::Backspace),
        KeyCode::Delete => InputAction::Edit(EditAction::Delete),
        KeyCode::Left => InputAction::Edit(EditAction::Left),
        KeyCode::Right => InputAction::Edit(EditAction::Right),
        KeyCode::Home => InputAction::Edit(EditAction::Home),
        KeyCode::End => InputAction::Edit(EditAction::End),
        _ => InputAction::None,
    }
}
