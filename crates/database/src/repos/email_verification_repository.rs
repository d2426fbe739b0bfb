//! Repository for email verification tokens.

use crate::entities::EmailVerification;
use crate::types::{VerificationError, VerificationResult};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

const VERIFICATION_COLUMNS: &str =
    "id, user_email, email, is_verified, verification_uuid, date_created, verified_at";

fn verification_from_row(row: &SqliteRow) -> VerificationResult<EmailVerification> {
    let raw_uuid: String = row.try_get("verification_uuid")?;
    let verification_uuid = Uuid::parse_str(&raw_uuid)
        .map_err(|e| VerificationError::DatabaseError(format!("corrupt verification uuid: {e}")))?;

    Ok(EmailVerification {
        id: row.try_get("id")?,
        user_email: row.try_get("user_email")?,
        email: row.try_get("email")?,
        is_verified: row.try_get("is_verified")?,
        verification_uuid,
        date_created: row.try_get("date_created")?,
        verified_at: row.try_get("verified_at")?,
    })
}

/// Repository for email verification database operations
#[derive(Clone)]
pub struct EmailVerificationRepository {
    pool: SqlitePool,
}

impl EmailVerificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Issue a new token for `email`, owned by `user_email`
    pub async fn create(&self, user_email: &str, email: &str) -> VerificationResult<EmailVerification> {
        let verification_uuid = Uuid::new_v4();

        let result = sqlx::query(
            "INSERT INTO email_verifications (user_email, email, is_verified, verification_uuid, date_created) \
             VALUES (?, ?, 0, ?, ?)",
        )
        .bind(user_email)
        .bind(email)
        .bind(verification_uuid.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(user = %user_email, email = %email, "email verification created");

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| VerificationError::DatabaseError("Failed to retrieve created verification".to_string()))
    }

    pub async fn find_by_id(&self, id: i64) -> VerificationResult<Option<EmailVerification>> {
        let row = sqlx::query(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM email_verifications WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(verification_from_row).transpose()
    }

    /// Find the token by its UUID
    pub async fn find_by_uuid(&self, verification_uuid: &Uuid) -> VerificationResult<Option<EmailVerification>> {
        let row = sqlx::query(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM email_verifications WHERE verification_uuid = ?"
        ))
        .bind(verification_uuid.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(verification_from_row).transpose()
    }

    /// Most recently issued token for an email address
    pub async fn find_latest_by_email(&self, email: &str) -> VerificationResult<Option<EmailVerification>> {
        let row = sqlx::query(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM email_verifications WHERE email = ? \
             ORDER BY date_created DESC, id DESC LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(verification_from_row).transpose()
    }

    /// All tokens issued for a user, newest first
    pub async fn list_for_user(&self, user_email: &str) -> VerificationResult<Vec<EmailVerification>> {
        let rows = sqlx::query(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM email_verifications WHERE user_email = ? \
             ORDER BY date_created DESC, id DESC"
        ))
        .bind(user_email)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(verification_from_row).collect()
    }

    /// Mark the token verified and activate its owner in one transaction.
    ///
    /// Fails with `AlreadyVerified` when the token was consumed before, which
    /// leaves both rows untouched.
    pub async fn mark_verified(
        &self,
        verification: &EmailVerification,
        at: DateTime<Utc>,
    ) -> VerificationResult<EmailVerification> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE email_verifications SET is_verified = 1, verified_at = ? WHERE id = ? AND is_verified = 0",
        )
        .bind(at)
        .bind(verification.id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(VerificationError::AlreadyVerified(verification.email.clone()));
        }

        let activated = sqlx::query("UPDATE users SET is_active = 1, last_update_date = ? WHERE email = ?")
            .bind(Utc::now())
            .bind(&verification.user_email)
            .execute(&mut *tx)
            .await?;

        if activated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(VerificationError::UserNotFound);
        }

        tx.commit().await?;

        info!(email = %verification.email, user = %verification.user_email, "email verified and user activated");

        self.find_by_id(verification.id)
            .await?
            .ok_or_else(|| VerificationError::TokenNotFound(verification.verification_uuid.to_string()))
    }
}
