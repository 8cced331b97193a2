use anyhow::Result;

mod app;
mod auth;
mod config;
mod gemini;
mod handler;
mod tui;
mod ui;

use app::App;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut config = Config::load().unwrap_or_else(|_| Config::new());
    config.apply_env();

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(config);

    let result = run(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, events: &mut tui::EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }

        // Ticks arrive every 300ms, so finished backend calls are applied
        // promptly even without user input.
        drain_finished_tasks(app).await;
    }
    Ok(())
}

/// Join any settled backend task and apply its outcome. Tasks are never
/// cancelled; an in-flight call always settles through here.
async fn drain_finished_tasks(app: &mut App) {
    if app.auth_task.as_ref().is_some_and(|t| t.is_finished()) {
        if let Some(task) = app.auth_task.take() {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("authentication task failed: {e}")),
            };
            app.finish_auth(result);
        }
    }

    if app.chat_task.as_ref().is_some_and(|t| t.is_finished()) {
        if let Some(task) = app.chat_task.take() {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("generation task failed: {e}")),
            };
            app.finish_send(result);
        }
    }
}

/// Diagnostics go to a file under the config directory; stderr belongs to
/// the terminal UI. Best-effort: a missing config dir disables logging.
fn init_tracing() {
    let Ok(path) = Config::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    else {
        return;
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("charla=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init();
}
