use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Result;
use crossterm::{event::{DisableMouseCapture, EnableMouseCapture}, execute, terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen}};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use todo_store::{
    application::{controller::TodoController, todo_store::TodoStore},
    config::AppConfig,
    domain::storage::KeyValueStorage,
    infrastructure::sqlite_kv::{prepare_sqlite_file, SqliteKeyValueStore},
    presentation::tui::{self, App},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env();

    // The terminal is taken by the UI, so logs go to a file.
    let log_file = OpenOptions::new().create(true).append(true).open(&config.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    // Ensure SQLite file can be created/opened when using a file-backed URL
    prepare_sqlite_file(&config.database_url)?;
    let storage = SqliteKeyValueStore::connect(&config.database_url).await?;
    storage.init().await?;
    let store = TodoStore::open(storage).await?;
    tracing::info!(database_url = %config.database_url, count = store.count(), "session started");
    let mut app = App::new(TodoController::new(store, config.on_save));

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = tui::run(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    tracing::info!("shutdown");
    res
}
