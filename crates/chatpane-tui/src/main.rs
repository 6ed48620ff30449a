use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use clap::Parser;
use chatpane_core::{Config, HttpBackend};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "chatpane")]
#[command(about = "Terminal chat client with per-message translation", version)]
struct Cli {
    /// Chat server base URL (overrides CHATPANE_SERVER and the config file)
    #[arg(short, long)]
    server: Option<String>,

    /// Write logs here instead of the default location in the config directory
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Remember --server in the config file
    #[arg(long, requires = "server")]
    save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|_| Config::new());

    let log_path = match cli.log_file {
        Some(path) => path,
        None => config.log_path()?,
    };
    init_logging(&log_path)?;

    let server_url = config.resolve_server_url(cli.server.as_deref());
    if cli.save {
        Config::save_server_url(&server_url)?;
        log::info!("Saved server {} to config", server_url);
    }

    let backend = HttpBackend::new(&server_url, config.request_timeout())
        .context("Failed to build HTTP client")?;
    log::info!("Starting chatpane against {}", backend.base_url());

    let mut app = App::new(backend);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    if let Err(e) = &result {
        log::error!("Exiting with error: {:#}", e);
    }
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}

/// Send `log` output to a file; the terminal itself is owned by the TUI
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();

    Ok(())
}
