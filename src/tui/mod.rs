//! TUI - Terminal User Interface.
//!
//! The host for the client core: it owns the terminal and runs the single
//! event loop through which every state change flows.
//!
//! # Modules
//!
//! - [`guard`] - Terminal state RAII guard for cleanup
//! - [`render`] - Layout and drawing
//! - [`runner`] - TuiRunner struct and event loop

pub mod guard;
pub mod render;
pub mod runner;

#[doc(inline)]
pub use guard::TerminalGuard;
#[doc(inline)]
pub use render::{render, RenderContext};
#[doc(inline)]
pub use runner::TuiRunner;
