//! Development token minting: `maker-copilot token`.

use anyhow::{Context, Result};
use maker_copilot::auth::JwtKeys;
use maker_copilot::config::{AppConfig, MAX_TOKEN_TTL_SECS};
use maker_copilot::db::CopilotDb;

pub fn cmd_token(
    config: &AppConfig,
    user_id: Option<i64>,
    email: Option<&str>,
    ttl_secs: Option<u64>,
) -> Result<()> {
    if config.auth.jwt_secret.is_empty() {
        anyhow::bail!("auth.jwt_secret is not set; cannot sign tokens");
    }

    let user_id = match (user_id, email) {
        (Some(id), _) => id,
        (None, Some(email)) => {
            let db = CopilotDb::new(&config.database.path)?;
            db.find_user_id_by_email(email)?
                .with_context(|| format!("No user with email '{}'", email))?
        }
        (None, None) => anyhow::bail!("Pass --user-id or --email"),
    };

    let ttl_secs = ttl_secs.unwrap_or(config.auth.token_ttl_secs);
    if !(1..=MAX_TOKEN_TTL_SECS).contains(&ttl_secs) {
        anyhow::bail!(
            "Token lifetime must be between 1 and {} seconds, got {}",
            MAX_TOKEN_TTL_SECS,
            ttl_secs
        );
    }

    let keys = JwtKeys::new(&config.auth.jwt_secret, ttl_secs);
    let token = keys
        .issue_token(user_id, vec!["ROLE_USER".to_string()])
        .context("Failed to sign token")?;
    println!("{}", token);
    Ok(())
}
