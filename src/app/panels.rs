//! Panel contents exposed to the renderer.
//!
//! Histories are append-only except for explicit clears. The character
//! panel holds a single status text that is replaced wholesale.

use crate::constants;

/// Plain-text panel buffers.
///
/// The renderer reads these; only the dispatcher, the command router and
/// the host's lifecycle handling write them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panels {
    character: String,
    chat: Vec<String>,
    system: Vec<String>,
    debug: Vec<String>,
}

impl Default for Panels {
    fn default() -> Self {
        Self {
            character: constants::CHARACTER_PLACEHOLDER.to_string(),
            chat: Vec::new(),
            system: Vec::new(),
            debug: vec![constants::CONNECTING_MESSAGE.to_string()],
        }
    }
}

impl Panels {
    /// Panels with their initial contents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current character status text.
    pub fn character(&self) -> &str {
        &self.character
    }

    /// Chat history, oldest first.
    pub fn chat(&self) -> &[String] {
        &self.chat
    }

    /// System notices, oldest first.
    pub fn system(&self) -> &[String] {
        &self.system
    }

    /// Debug window lines, oldest first.
    pub fn debug(&self) -> &[String] {
        &self.debug
    }

    /// Replaces the character status text.
    pub fn set_character(&mut self, text: impl Into<String>) {
        self.character = text.into();
    }

    /// Appends a line to the chat history.
    pub fn push_chat(&mut self, line: impl Into<String>) {
        self.chat.push(line.into());
    }

    /// Appends a notice to the system panel.
    pub fn push_system(&mut self, line: impl Into<String>) {
        self.system.push(line.into());
    }

    /// Appends a line to the debug window.
    pub fn push_debug(&mut self, line: impl Into<String>) {
        self.debug.push(line.into());
    }

    /// Clears the chat history.
    pub fn clear_chat(&mut self) {
        self.chat.clear();
    }

    /// Clears the system history.
    pub fn clear_system(&mut self) {
        self.system.clear();
    }

    /// Last system notice, if any.
    pub fn last_system(&self) -> Option<&str> {
        self.system.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_contents() {
        let panels = Panels::new();
        assert_eq!(panels.character(), constants::CHARACTER_PLACEHOLDER);
        assert!(panels.chat().is_empty());
        assert!(panels.system().is_empty());
        assert_eq!(panels.debug(), [constants::CONNECTING_MESSAGE]);
    }

    #[test]
    fn test_histories_append_in_order() {
        let mut panels = Panels::new();
        panels.push_system("one");
        panels.push_system("two");
        assert_eq!(panels.system(), ["one", "two"]);
        assert_eq!(panels.last_system(), Some("two"));
    }

    #[test]
    fn test_clear_is_per_panel() {
        let mut panels = Panels::new();
        panels.push_chat("hello");
        panels.push_system("notice");
        panels.clear_chat();
        assert!(panels.chat().is_empty());
        assert_eq!(panels.system().len(), 1);
        panels.clear_system();
        assert!(panels.system().is_empty());
    }

    #[test]
    fn test_character_is_replaced() {
        let mut panels = Panels::new();
        panels.set_character("Aria\n    HP: 10");
        panels.set_character("Aria\n    HP: 7");
        assert_eq!(panels.character(), "Aria\n    HP: 7");
    }
}
