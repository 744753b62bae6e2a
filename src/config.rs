//! Service configuration.
//!
//! Settings are layered: `copilot.toml` → `COPILOT_*` environment variables
//! (a `.env` file is loaded first when present) → CLI flags.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! cors_permissive = false
//!
//! [database]
//! path = "copilot.db"
//!
//! [auth]
//! jwt_secret = "change-me-to-a-long-random-string"
//! token_ttl_secs = 3600
//!
//! [widget]
//! max_in_values = 100
//!
//! [report]
//! top_n = 10
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::report::DEFAULT_TOP_N;
use crate::widget::translator::DEFAULT_MAX_IN_VALUES;

pub const DEFAULT_CONFIG_FILE: &str = "copilot.toml";

const MIN_SECRET_LEN: usize = 32;

/// Longest token lifetime accepted from configuration or the CLI (one year).
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 3600;

const MAX_REPORT_TOP_N: usize = 1000;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: pretty, json", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow any origin. Meant for local front-end development.
    #[serde(default)]
    pub cors_permissive: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_permissive: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("copilot.db")
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSection {
    /// HS256 signing secret shared with the identity provider.
    #[serde(default)]
    pub jwt_secret: String,
    /// Lifetime of tokens minted by `maker-copilot token`.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

fn default_token_ttl() -> u64 {
    3600
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSection {
    #[serde(default = "default_max_in_values")]
    pub max_in_values: usize,
}

fn default_max_in_values() -> usize {
    DEFAULT_MAX_IN_VALUES
}

impl Default for WidgetSection {
    fn default() -> Self {
        Self {
            max_in_values: default_max_in_values(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Root of `copilot.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub widget: WidgetSection,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse copilot.toml")
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize copilot.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `COPILOT_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply `COPILOT_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("COPILOT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("COPILOT_PORT") {
            self.server.port = parse_env("COPILOT_PORT", &port)?;
        }
        if let Some(cors) = lookup("COPILOT_CORS_PERMISSIVE") {
            self.server.cors_permissive = parse_env("COPILOT_CORS_PERMISSIVE", &cors)?;
        }
        if let Some(path) = lookup("COPILOT_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(secret) = lookup("COPILOT_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(ttl) = lookup("COPILOT_TOKEN_TTL_SECS") {
            self.auth.token_ttl_secs = parse_env("COPILOT_TOKEN_TTL_SECS", &ttl)?;
        }
        if let Some(max) = lookup("COPILOT_MAX_IN_VALUES") {
            self.widget.max_in_values = parse_env("COPILOT_MAX_IN_VALUES", &max)?;
        }
        if let Some(top_n) = lookup("COPILOT_REPORT_TOP_N") {
            self.report.top_n = parse_env("COPILOT_REPORT_TOP_N", &top_n)?;
        }
        if let Some(level) = lookup("COPILOT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("COPILOT_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    /// Validate the configuration and return any problems found.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.server.port == 0 {
            problems.push("server.port must be non-zero".to_string());
        }
        if self.auth.jwt_secret.is_empty() {
            problems.push(
                "auth.jwt_secret is empty; set it in copilot.toml or COPILOT_JWT_SECRET"
                    .to_string(),
            );
        } else if self.auth.jwt_secret.len() < MIN_SECRET_LEN {
            problems.push(format!(
                "auth.jwt_secret is shorter than {} characters",
                MIN_SECRET_LEN
            ));
        }
        if self.auth.token_ttl_secs == 0 {
            problems.push("auth.token_ttl_secs must be greater than 0".to_string());
        } else if self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            problems.push(format!(
                "auth.token_ttl_secs must be at most {}",
                MAX_TOKEN_TTL_SECS
            ));
        }
        if self.widget.max_in_values == 0 {
            problems.push("widget.max_in_values must be greater than 0".to_string());
        }
        if !(1..=MAX_REPORT_TOP_N).contains(&self.report.top_n) {
            problems.push(format!(
                "report.top_n must be between 1 and {}",
                MAX_REPORT_TOP_N
            ));
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            problems.push(format!(
                "logging.level '{}' is not a valid filter directive",
                self.logging.level
            ));
        }

        problems
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid {} value '{}'", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.widget.max_in_values, 100);
        assert_eq!(config.report.top_n, 10);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_sections() {
        let config = AppConfig::parse(
            r#"
[server]
port = 9000
cors_permissive = true

[auth]
jwt_secret = "s3cret"

[logging]
format = "json"
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.server.cors_permissive);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_rejects_unknown_log_format() {
        assert!(AppConfig::parse("[logging]\nformat = \"xml\"").is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = AppConfig::parse("[server]\nport = 9000").unwrap();
        config
            .apply_env_with(env(&[
                ("COPILOT_PORT", "7000"),
                ("COPILOT_JWT_SECRET", "from-env"),
                ("COPILOT_DATABASE_PATH", "/tmp/x.db"),
                ("COPILOT_LOG_FORMAT", "JSON"),
                ("COPILOT_MAX_IN_VALUES", "25"),
            ]))
            .unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(config.database.path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.widget.max_in_values, 25);
    }

    #[test]
    fn test_env_rejects_malformed_numbers() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_with(env(&[("COPILOT_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("COPILOT_PORT"));
    }

    #[test]
    fn test_validate_flags_problems() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        config.report.top_n = 0;
        let problems = config.validate();
        assert!(problems.iter().any(|p| p.contains("server.port")));
        assert!(problems.iter().any(|p| p.contains("jwt_secret is empty")));
        assert!(problems.iter().any(|p| p.contains("report.top_n")));

        config.auth.jwt_secret = "short".into();
        assert!(config.validate().iter().any(|p| p.contains("shorter than")));
    }

    #[test]
    fn test_validate_caps_token_ttl_and_top_n() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "x".repeat(40);
        config.auth.token_ttl_secs = u64::MAX;
        config.report.top_n = usize::MAX;
        let problems = config.validate();
        assert!(problems.iter().any(|p| p.contains("token_ttl_secs must be at most")));
        assert!(problems.iter().any(|p| p.contains("report.top_n")));

        config.auth.token_ttl_secs = MAX_TOKEN_TTL_SECS;
        config.report.top_n = 1000;
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "x".repeat(40);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        let mut config = AppConfig::default();
        config.report.top_n = 3;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.report.top_n, 3);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
