//! Focus state for the dreamer TUI.
//!
//! Exactly one panel has keyboard focus at a time. The debug window is
//! focused at start (it shows connection progress) and whenever a retry
//! prompt is open.

/// The panel that currently receives keyboard input.
///
/// # Focus Transitions
///
/// - `F2` focuses `Chat`, `F3` `System`, `F4` `Character`, `F5` `Debug`
/// - A successful connection moves focus from `Debug` to `Chat`
/// - A failed connection moves focus to `Debug` for the retry prompt
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Focus {
    /// Full-screen debug window: connection progress, retry prompt, dumps.
    #[default]
    Debug,

    /// Chat panel with the command/chat input line.
    Chat,

    /// System panel (notices).
    System,

    /// Character status panel.
    Character,
}

impl Focus {
    /// Returns true if the debug window replaces the main view.
    pub fn is_full_screen(self) -> bool {
        matches!(self, Focus::Debug)
    }

    /// Returns true if this panel accepts text input.
    pub fn accepts_text_input(self) -> bool {
        matches!(self, Focus::Chat)
    }

    /// Returns a human-readable name for the panel.
    pub fn display_name(self) -> &'static str {
        match self {
            Focus::Debug => "Debug",
            Focus::Chat => "Chat",
            Focus::System => "System",
            Focus::Character => "Character",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_default_is_debug() {
        assert_eq!(Focus::default(), Focus::Debug);
    }

    #[test]
    fn test_focus_full_screen() {
        assert!(Focus::Debug.is_full_screen());
        assert!(!Focus::Chat.is_full_screen());
        assert!(!Focus::System.is_full_screen());
        assert!(!Focus::Character.is_full_screen());
    }

    #[test]
    fn test_focus_accepts_text_input() {
        assert!(Focus::Chat.accepts_text_input());
        assert!(!Focus::Debug.accepts_text_input());
        assert!(!Focus::System.accepts_text_input());
    }

    #[test]
    fn test_focus_display_name() {
        assert_eq!(Focus::Chat.display_name(), "Chat");
        assert_eq!(Focus::Debug.display_name(), "Debug");
    }
}
