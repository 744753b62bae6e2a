use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use maker_copilot::config::{AppConfig, DEFAULT_CONFIG_FILE};
use maker_copilot::logging::init_tracing;

mod cmd;

#[derive(Parser)]
#[command(name = "maker-copilot")]
#[command(version, about = "Sales analytics back-end for makers")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// SQLite database path. Overrides [database] path.
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Log filter directive, e.g. "debug" or "maker_copilot=trace"
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable dev mode (CORS permissive for a local front-end)
        #[arg(long)]
        dev: bool,
    },
    /// Create the database and run migrations
    InitDb,
    /// Populate a demo account with a year of sales
    Seed {
        /// Email of the demo user to create
        #[arg(long, default_value = "demo@maker-copilot.local")]
        email: String,

        /// Calendar year of the generated sales (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Print a signed bearer token for a user
    Token {
        /// User id to put in the token subject
        #[arg(long, conflicts_with = "email")]
        user_id: Option<i64>,

        /// Look the user up by email instead
        #[arg(long)]
        email: Option<String>,

        /// Token lifetime in seconds. Overrides [auth] token_ttl_secs.
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// View and manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and report problems
    Validate,
    /// Write a default copilot.toml
    Init,
}

/// Layer file → environment → CLI flags.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load_or_default(&cli.config)?;
    config.apply_env()?;
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Commands::Serve { host, port, dev } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
        if *dev {
            config.server.cors_permissive = true;
        }
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.logging)?;

    match &cli.command {
        Commands::Serve { .. } => cmd::cmd_serve(&config).await?,
        Commands::InitDb => cmd::cmd_init_db(&config)?,
        Commands::Seed { email, year } => cmd::cmd_seed(&config, email, *year)?,
        Commands::Token {
            user_id,
            email,
            ttl,
        } => cmd::cmd_token(&config, *user_id, email.as_deref(), *ttl)?,
        Commands::Config { command } => cmd::cmd_config(&cli.config, &config, command.clone())?,
    }

    Ok(())
}
