use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod gemini;
mod handler;
mod markdown;
mod session;
mod topic;
mod tui;
mod ui;

use app::App;
use config::Config;
use gemini::{GeminiClient, DEFAULT_MODEL};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    let Some(api_key) = config.resolve_api_key() else {
        // First run: write a template config so the message below points at
        // a file that actually exists
        if Config::config_path().map(|p| !p.exists()).unwrap_or(false) {
            let _ = config.save();
        }
        eprintln!("No Gemini API key found.");
        eprintln!(
            "Set the GEMINI_API_KEY environment variable, or add \"api_key\" to {}",
            Config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "the config file".to_string())
        );
        std::process::exit(1);
    };

    init_tracing();

    let model = config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let gemini = GeminiClient::new(&api_key, &model);
    let mut app = App::new(gemini);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event)?;
        }

        // Fold a finished generation request into the transcript; ticks keep
        // this running while the user is idle
        app.poll_generation().await;
    }

    Ok(())
}

/// Diagnostics go to a log file under the config directory; stdout belongs to
/// the TUI. Logging is best-effort: the app runs fine without it.
fn init_tracing() {
    let Ok(path) = Config::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .try_init();
}
