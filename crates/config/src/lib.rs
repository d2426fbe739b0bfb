use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "userext.toml",
    "config/userext.toml",
    "crates/config/userext.toml",
    "../userext.toml",
    "../config/userext.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub users: UsersConfig,
    #[serde(default)]
    pub addresses: AddressConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://userext.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Email verification settings.
///
/// `expire_hours` left unset means verification tokens never expire.
///
/// ```
/// use userext_config::VerificationConfig;
///
/// let verification = VerificationConfig::default();
/// assert!(verification.expire_hours.is_none());
/// assert_eq!(verification.from_email, "no-reply@localhost");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    #[serde(default)]
    pub expire_hours: Option<i64>,
    #[serde(default = "VerificationConfig::default_subject")]
    pub subject: String,
    #[serde(default = "VerificationConfig::default_from_email")]
    pub from_email: String,
}

impl VerificationConfig {
    /// Largest token lifetime that still fits a millisecond-precision duration
    pub const MAX_EXPIRE_HOURS: i64 = i64::MAX / 3_600_000;

    fn default_subject() -> String {
        "Verify your email address".to_string()
    }

    fn default_from_email() -> String {
        "no-reply@localhost".to_string()
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            expire_hours: None,
            subject: Self::default_subject(),
            from_email: Self::default_from_email(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    #[default]
    Console,
    Smtp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub backend: MailBackend,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "SmtpConfig::default_host")]
    pub host: String,
    #[serde(default = "SmtpConfig::default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default = "SmtpConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl SmtpConfig {
    fn default_host() -> String {
        "localhost".to_string()
    }

    const fn default_port() -> u16 {
        25
    }

    const fn default_timeout() -> u64 {
        30
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            username: None,
            password: None,
            use_tls: false,
            timeout_secs: Self::default_timeout(),
        }
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("use_tls", &self.use_tls)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersConfig {
    #[serde(default = "UsersConfig::default_min_age")]
    pub min_age_years: u32,
}

impl UsersConfig {
    const fn default_min_age() -> u32 {
        13
    }
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            min_age_years: Self::default_min_age(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressConfig {
    /// Only accept address phone numbers the owner has verified.
    #[serde(default)]
    pub enforce_verified_phone: bool,
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use userext_config::load;
///
/// std::env::remove_var("USEREXT_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.database.url.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let builder = config::Config::builder()
        .set_default("database.url", defaults.database.url.clone())
        .context("invalid default for database.url")?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )
        .context("invalid default for database.max_connections")?
        .set_default("verification.subject", defaults.verification.subject.clone())
        .context("invalid default for verification.subject")?
        .set_default(
            "verification.from_email",
            defaults.verification.from_email.clone(),
        )
        .context("invalid default for verification.from_email")?
        .set_default("users.min_age_years", i64::from(defaults.users.min_age_years))
        .context("invalid default for users.min_age_years")?;

    let mut builder = builder;
    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("USEREXT_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via USEREXT_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(config::Environment::with_prefix("USEREXT").separator("__"));

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if let Some(hours) = config.verification.expire_hours {
        if hours < 0 {
            anyhow::bail!("invalid configuration: verification.expire_hours must not be negative");
        }
        if hours > VerificationConfig::MAX_EXPIRE_HOURS {
            anyhow::bail!(
                "invalid configuration: verification.expire_hours must be at most {}",
                VerificationConfig::MAX_EXPIRE_HOURS
            );
        }
    }

    debug!(?config, "loaded configuration");
    Ok(config)
}
