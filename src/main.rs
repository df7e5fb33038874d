//! Dreamer - terminal client for a SignalR game server.
//!
//! This is the main binary entry point. See the `dreamer` library for the
//! core functionality.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dreamer::constants::VERSION;
use dreamer::transport::SignalRConnector;
use dreamer::{tui, App, Config};
use mimalloc::MiMalloc;
use ratatui::{backend::CrosstermBackend, Terminal};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// CLI
#[derive(Parser)]
#[command(name = "dreamer")]
#[command(version = VERSION)]
#[command(about = "Terminal client for a SignalR game server")]
struct Cli {
    /// Settings file (defaults to ./settings.json, then the config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server base URL, overriding the settings file
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Connect over WebSocket directly, without the negotiate request
    #[arg(long, global = true)]
    skip_negotiation: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as JSON
    Config,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(server_url) = &self.server_url {
            config.server_url.clone_from(server_url);
        }
        if self.skip_negotiation {
            config.skip_negotiation = true;
        }
        Ok(config)
    }
}

/// Log file: `DREAMER_LOG_FILE`, else the config dir, else the temp dir.
fn log_path() -> PathBuf {
    if let Ok(path) = std::env::var("DREAMER_LOG_FILE") {
        return PathBuf::from(path);
    }
    Config::config_dir()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok())
        .unwrap_or_else(std::env::temp_dir)
        .join("dreamer.log")
}

fn init_logging() -> Result<()> {
    let log_path = log_path();
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("Failed to create log file at {}", log_path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .format_timestamp_secs()
        .init();
    Ok(())
}

fn run_tui(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let target = config.hub_url();
    let connector = Arc::new(SignalRConnector::from_config(&config));
    let app = App::with_connector(connector, target, config.connect_timeouts(), config.title);

    runtime.block_on(async move {
        // Set up the terminal only after everything that could fail visibly
        let _terminal_guard = tui::TerminalGuard::enter()?;
        let terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;

        log::info!("Dreamer v{} started", VERSION);
        let mut runner = tui::TuiRunner::new(app, terminal);
        runner.run().await
    })
}

fn main() -> Result<()> {
    // Log to a file so the TUI owns stdout
    init_logging()?;

    // Log panics and restore the terminal before the default hook prints
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        log::error!("PANIC: {:?}", panic_info);
        tui::guard::restore();
        default_hook(panic_info);
    }));

    let cli = Cli::parse();
    let config = cli.load_config()?;

    match cli.command {
        Some(Commands::Config) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        None => {
            log::info!("Connecting to {}", config.hub_url());
            run_tui(config)?;
        }
    }

    Ok(())
}
