//! Server and database bootstrap commands: `maker-copilot serve`, `init-db`.

use anyhow::{Context, Result};
use maker_copilot::config::AppConfig;
use maker_copilot::db::CopilotDb;
use maker_copilot::server;
use tracing::info;

pub async fn cmd_serve(config: &AppConfig) -> Result<()> {
    server::start_server(config).await
}

pub fn cmd_init_db(config: &AppConfig) -> Result<()> {
    let path = &config.database.path;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    CopilotDb::new(path).context("Failed to initialize database")?;
    info!(path = %path.display(), "Database ready");
    println!("Database initialized at {}", path.display());
    Ok(())
}
