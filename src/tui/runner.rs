//! TUI Runner - the host event loop.
//!
//! The runner owns the [`App`] and the terminal. Everything that touches
//! session state or panels happens on this loop, one event at a time.
//!
//! # Event Loop
//!
//! ```text
//! tokio::select! over
//! ├── lifecycle_rx   - results of connect attempts and lost-connection watchers
//! ├── dispatcher     - next inbound item (only while draining)
//! ├── key_rx         - key events from the key reader thread
//! └── frame tick     - redraw
//! ```
//!
//! Connect attempts and lost-connection watchers run as spawned tasks and
//! report back through `lifecycle_rx`; they never touch `App` directly.

// Rust guideline compliant 2026-01

use std::io::Stdout;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;

use crate::app::{handle_key, App, AppEffect};
use crate::constants;
use crate::events::LifecycleEvent;

use super::render::{render, RenderContext};

/// Owns the app and the terminal for the lifetime of the TUI.
pub struct TuiRunner {
    app: App,
    terminal: Terminal<CrosstermBackend<Stdout>>,
    lifecycle_tx: mpsc::UnboundedSender<LifecycleEvent>,
    lifecycle_rx: mpsc::UnboundedReceiver<LifecycleEvent>,
    shutdown: Arc<AtomicBool>,
}

impl std::fmt::Debug for TuiRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TuiRunner")
            .field("app", &self.app)
            .finish_non_exhaustive()
    }
}

impl TuiRunner {
    /// Creates a runner.
    pub fn new(app: App, terminal: Terminal<CrosstermBackend<Stdout>>) -> Self {
        let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
        Self {
            app,
            terminal,
            lifecycle_tx,
            lifecycle_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs until the user quits.
    ///
    /// # Errors
    ///
    /// Returns an error on a fatal connection failure or if the terminal
    /// fails.
    pub async fn run(&mut self) -> Result<()> {
        log::info!("TuiRunner event loop starting");

        let mut key_rx = spawn_key_reader(Arc::clone(&self.shutdown))?;
        let mut frame_tick = tokio::time::interval(constants::FRAME_RATE_DELAY);

        self.perform(AppEffect::Connect);
        let result = self.event_loop(&mut key_rx, &mut frame_tick).await;

        self.shutdown.store(true, Ordering::SeqCst);
        self.app.connection.disconnect();
        log::info!("TuiRunner event loop exiting");
        result
    }

    async fn event_loop(
        &mut self,
        key_rx: &mut mpsc::UnboundedReceiver<KeyEvent>,
        frame_tick: &mut tokio::time::Interval,
    ) -> Result<()> {
        while !self.app.should_quit() {
            tokio::select! {
                Some(event) = self.lifecycle_rx.recv() => {
                    let effect = self.app.handle_lifecycle(event)?;
                    self.perform(effect);
                }
                call = self.app.dispatcher.next(), if self.app.dispatcher.is_draining() => {
                    match call {
                        Some(call) => {
                            let effect = self.app.process_inbound(call)?;
                            self.perform(effect);
                        }
                        None => {
                            log::warn!("[Dispatch] Inbound queue closed");
                            self.app.dispatcher.disarm();
                        }
                    }
                }
                key = key_rx.recv() => {
                    let Some(key) = key else {
                        log::info!("Key reader stopped, quitting");
                        break;
                    };
                    let action = handle_key(key, self.app.focus, self.app.retry_pending);
                    let effect = self.app.handle_input(action);
                    self.perform(effect);
                }
                _ = frame_tick.tick() => self.draw()?,
            }
        }
        Ok(())
    }

    /// Spawns whatever async work the app asked for.
    fn perform(&mut self, effect: AppEffect) {
        match effect {
            AppEffect::None => {}
            AppEffect::Connect => {
                let attempt = self.app.begin_connect();
                let tx = self.lifecycle_tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(attempt.await);
                });
            }
            AppEffect::WatchClosed => {
                if let Some(watch) = self.app.connection.watch_closed() {
                    let tx = self.lifecycle_tx.clone();
                    tokio::spawn(async move {
                        let _ = tx.send(watch.await);
                    });
                }
            }
        }
    }

    fn draw(&mut self) -> Result<()> {
        let ctx = RenderContext::from_app(&self.app);
        self.terminal.draw(|frame| render(frame, &ctx))?;
        Ok(())
    }
}

/// Reads key events on a dedicated thread until `shutdown` is set or the
/// runner goes away.
fn spawn_key_reader(shutdown: Arc<AtomicBool>) -> Result<mpsc::UnboundedReceiver<KeyEvent>> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("key-reader".to_string())
        .spawn(move || {
            while !shutdown.load(Ordering::SeqCst) {
                match event::poll(constants::INPUT_POLL_INTERVAL) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(e) => {
                        log::error!("Input poll failed: {}", e);
                        break;
                    }
                }
                match event::read() {
                    Ok(Event::Key(key)) => {
                        if tx.send(key).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        log::error!("Input read failed: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}
