use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;
use userext_config::{AppConfig, MailBackend};
use userext_database::initialize_database;
use userext_users::{mailer_from_config, AccountServices, Mailer};

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub mailer: Arc<dyn Mailer>,
    pub accounts: AccountServices,
}

impl BackendServices {
    /// Open the database, apply migrations and wire the account services
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let mailer = mailer_from_config(&config.mail);
        Self::initialise_with_mailer(config, mailer).await
    }

    pub async fn initialise_with_mailer(config: &AppConfig, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let accounts = AccountServices::new(db_pool.clone(), config, mailer.clone());

        let backend = match config.mail.backend {
            MailBackend::Console => "console",
            MailBackend::Smtp => "smtp",
        };
        info!(
            url = %config.database.url,
            mail = backend,
            expire_hours = ?config.verification.expire_hours,
            "account services ready"
        );

        Ok(Self {
            db_pool,
            mailer,
            accounts,
        })
    }
}
