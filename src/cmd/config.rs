//! Configuration view and validation commands: `maker-copilot config`.

use std::path::Path;

use anyhow::{Context, Result};
use maker_copilot::config::AppConfig;

use crate::ConfigCommands;

const REDACTED: &str = "********";

pub fn cmd_config(
    config_path: &Path,
    effective: &AppConfig,
    command: Option<ConfigCommands>,
) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            if config_path.exists() {
                println!("# Config file: {}", config_path.display());
            } else {
                println!("# No config file at {}; showing defaults", config_path.display());
            }
            println!("# Effective values (file + COPILOT_* env + CLI flags)");
            println!();

            let mut shown = effective.clone();
            if !shown.auth.jwt_secret.is_empty() {
                shown.auth.jwt_secret = REDACTED.to_string();
            }
            let rendered =
                toml::to_string_pretty(&shown).context("Failed to render configuration")?;
            println!("{}", rendered);
        }
        Some(ConfigCommands::Validate) => {
            let problems = effective.validate();
            if problems.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration problems:");
                for problem in &problems {
                    println!("  - {}", problem);
                }
                anyhow::bail!("{} configuration problem(s) found", problems.len());
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists.", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }
            if let Some(parent) = config_path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }

            AppConfig::default().save(config_path)?;

            println!("Created {}", config_path.display());
            println!();
            println!("Set [auth] jwt_secret (or COPILOT_JWT_SECRET) before running 'serve'.");
        }
    }

    Ok(())
}
