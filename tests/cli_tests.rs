//! Integration tests for the maker-copilot binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use maker_copilot::auth::JwtKeys;
use predicates::prelude::*;
use tempfile::TempDir;

const SECRET: &str = "cli-test-secret-0123456789abcdefghijklmn";

/// Command running in `dir` with no ambient COPILOT_* settings.
fn copilot(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("maker-copilot");
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("COPILOT_JWT_SECRET")
        .env_remove("COPILOT_DATABASE_PATH")
        .env_remove("COPILOT_PORT");
    cmd
}

fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let dir = temp_dir();
        copilot(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("token"));
    }

    #[test]
    fn test_version() {
        let dir = temp_dir();
        copilot(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        let dir = temp_dir();
        copilot(&dir).arg("frobnicate").assert().failure();
    }
}

mod config_commands {
    use super::*;

    #[test]
    fn test_config_init_writes_default_file() {
        let dir = temp_dir();
        copilot(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created copilot.toml"));

        let content = std::fs::read_to_string(dir.path().join("copilot.toml")).unwrap();
        assert!(content.contains("[server]"));
        assert!(content.contains("max_in_values = 100"));

        copilot(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_validate_reports_missing_secret() {
        let dir = temp_dir();
        copilot(&dir)
            .args(["config", "validate"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("jwt_secret is empty"));
    }

    #[test]
    fn test_config_validate_accepts_env_secret() {
        let dir = temp_dir();
        copilot(&dir)
            .env("COPILOT_JWT_SECRET", SECRET)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_config_show_redacts_secret_and_applies_flags() {
        let dir = temp_dir();
        copilot(&dir)
            .env("COPILOT_JWT_SECRET", SECRET)
            .args(["--database", "data/shop.db", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("********"))
            .stdout(predicate::str::contains(SECRET).not())
            .stdout(predicate::str::contains("data/shop.db"));
    }

    #[test]
    fn test_config_file_values_are_used() {
        let dir = temp_dir();
        std::fs::write(
            dir.path().join("custom.toml"),
            "[report]\ntop_n = 3\n",
        )
        .unwrap();
        copilot(&dir)
            .args(["--config", "custom.toml", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("top_n = 3"));
    }
}

mod data_commands {
    use super::*;

    #[test]
    fn test_init_db_creates_database() {
        let dir = temp_dir();
        copilot(&dir)
            .args(["--database", "db/copilot.db", "init-db"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Database initialized"));
        assert!(dir.path().join("db/copilot.db").exists());
    }

    #[test]
    fn test_seed_then_token_by_email() {
        let dir = temp_dir();
        copilot(&dir)
            .args(["seed", "--email", "demo@example.com", "--year", "2024"])
            .assert()
            .success()
            .stdout(predicate::str::contains("with 36 sales in 2024"));

        copilot(&dir)
            .args(["seed", "--email", "demo@example.com"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));

        let output = copilot(&dir)
            .env("COPILOT_JWT_SECRET", SECRET)
            .args(["token", "--email", "demo@example.com"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let token = String::from_utf8(output.stdout).unwrap();
        let user = JwtKeys::new(SECRET, 60).verify(token.trim()).unwrap();
        assert_eq!(user.id, 1);
    }

    #[test]
    fn test_token_for_user_id() {
        let dir = temp_dir();
        let output = copilot(&dir)
            .env("COPILOT_JWT_SECRET", SECRET)
            .args(["token", "--user-id", "42", "--ttl", "120"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let token = String::from_utf8(output.stdout).unwrap();
        assert_eq!(token.trim().split('.').count(), 3);
        let user = JwtKeys::new(SECRET, 60).verify(token.trim()).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.roles, vec!["ROLE_USER"]);
    }

    #[test]
    fn test_token_rejects_oversized_ttl() {
        let dir = temp_dir();
        copilot(&dir)
            .env("COPILOT_JWT_SECRET", SECRET)
            .args(["token", "--user-id", "1", "--ttl", "18446744073709551615"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Token lifetime must be between"));
    }

    #[test]
    fn test_token_requires_secret() {
        let dir = temp_dir();
        copilot(&dir)
            .args(["token", "--user-id", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("jwt_secret is not set"));
    }

    #[test]
    fn test_token_for_unknown_email_fails() {
        let dir = temp_dir();
        copilot(&dir)
            .env("COPILOT_JWT_SECRET", SECRET)
            .args(["token", "--email", "ghost@example.com"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No user with email"));
    }
}
