//! Test plan for the `userext-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use userext_config::{load, AppConfig, MailBackend, SmtpConfig, UsersConfig, VerificationConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "USEREXT_CONFIG",
    "USEREXT__DATABASE__URL",
    "USEREXT__DATABASE__MAX_CONNECTIONS",
    "USEREXT__VERIFICATION__EXPIRE_HOURS",
    "USEREXT__VERIFICATION__SUBJECT",
    "USEREXT__VERIFICATION__FROM_EMAIL",
    "USEREXT__MAIL__BACKEND",
    "USEREXT__MAIL__SMTP__HOST",
    "USEREXT__MAIL__SMTP__PORT",
    "USEREXT__USERS__MIN_AGE_YEARS",
    "USEREXT__ADDRESSES__ENFORCE_VERIFIED_PHONE",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

fn isolated() -> (TempDir, TestContext) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());
    (temp_dir, ctx)
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let (_temp_dir, _ctx) = isolated();

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.database.max_connections, defaults.database.max_connections);
    assert!(config.verification.expire_hours.is_none());
    assert_eq!(config.verification.subject, defaults.verification.subject);
    assert_eq!(config.mail.backend, MailBackend::Console);
    assert_eq!(config.users.min_age_years, 13);
    assert!(!config.addresses.enforce_verified_phone);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "userext.toml",
        r#"
        [verification]
        expire_hours = 24
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/userext.toml",
        r#"
        [verification]
        expire_hours = 48
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.verification.expire_hours, Some(24));
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "userext.toml",
        r#"
        [database]
        max_connections = 50

        [addresses]
        enforce_verified_phone = true

        [mail]
        backend = "smtp"

        [mail.smtp]
        host = "smtp.example.com"
        port = 587
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert!(config.addresses.enforce_verified_phone);
    assert_eq!(config.mail.backend, MailBackend::Smtp);
    assert_eq!(config.mail.smtp.host, "smtp.example.com");
    assert_eq!(config.mail.smtp.port, 587);
    assert_eq!(config.mail.smtp.timeout_secs, SmtpConfig::default().timeout_secs);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "userext.toml",
        r#"
        [users]
        min_age_years = 16
        "#,
    );

    ctx.set_var("USEREXT__USERS__MIN_AGE_YEARS", "18");
    ctx.set_var("USEREXT__VERIFICATION__EXPIRE_HOURS", "72");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.users.min_age_years, 18);
    assert_eq!(config.verification.expire_hours, Some(72));
}

#[test]
#[serial]
fn load_reads_explicit_config_path() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [database]
        url = "sqlite://custom.db"
        "#,
    );
    let path = temp_dir.path().join("elsewhere/custom.toml");
    ctx.set_var("USEREXT_CONFIG", path.display().to_string());

    let config = load().expect("configuration load should read USEREXT_CONFIG");
    assert_eq!(config.database.url, "sqlite://custom.db");
}

#[test]
#[serial]
fn load_rejects_negative_expiry() {
    let (_temp_dir, mut ctx) = isolated();

    ctx.set_var("USEREXT__VERIFICATION__EXPIRE_HOURS", "-1");

    let error = load().expect_err("negative expiry should be rejected");
    assert!(error.to_string().contains("expire_hours"));
}

#[test]
#[serial]
fn load_rejects_out_of_range_expiry() {
    let (_temp_dir, mut ctx) = isolated();

    ctx.set_var(
        "USEREXT__VERIFICATION__EXPIRE_HOURS",
        (i64::MAX / 1000).to_string(),
    );
    let error = load().expect_err("oversized expiry should be rejected");
    assert!(error.to_string().contains("expire_hours must be at most"));

    ctx.set_var(
        "USEREXT__VERIFICATION__EXPIRE_HOURS",
        VerificationConfig::MAX_EXPIRE_HOURS.to_string(),
    );
    let config = load().expect("largest supported expiry should load");
    assert_eq!(
        config.verification.expire_hours,
        Some(VerificationConfig::MAX_EXPIRE_HOURS)
    );
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "userext.toml",
        r#"
        [database]
        max_connections = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn smtp_debug_output_hides_password() {
    let smtp = SmtpConfig {
        password: Some("hunter2".to_string()),
        ..SmtpConfig::default()
    };

    let rendered = format!("{smtp:?}");
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn section_defaults_match_expected_values() {
    assert_eq!(UsersConfig::default().min_age_years, 13);
    assert_eq!(VerificationConfig::default().subject, "Verify your email address");
    assert_eq!(SmtpConfig::default().port, 25);
}
