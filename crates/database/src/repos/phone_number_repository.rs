//! Repository for user phone numbers.
//!
//! Every write runs inside a transaction that keeps two flags consistent:
//! a number is verified for at most one owner, and an owner has at most one
//! default number.

use crate::entities::{CreatePhoneNumberRequest, PhoneNumber, UserPhoneNumber};
use crate::types::{PhoneNumberError, PhoneNumberResult};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};

const PHONE_COLUMNS: &str =
    "id, number, verified, is_default, owner_email, created_at, verified_status_updated_at";

pub(crate) fn phone_number_from_row(row: &SqliteRow) -> PhoneNumberResult<UserPhoneNumber> {
    let raw_number: String = row.try_get("number")?;
    let number = PhoneNumber::parse(&raw_number)
        .map_err(|_| PhoneNumberError::DatabaseError(format!("corrupt phone number '{raw_number}'")))?;

    Ok(UserPhoneNumber {
        id: row.try_get("id")?,
        number,
        verified: row.try_get("verified")?,
        is_default: row.try_get("is_default")?,
        owner_email: row.try_get("owner_email")?,
        created_at: row.try_get("created_at")?,
        verified_status_updated_at: row.try_get("verified_status_updated_at")?,
    })
}

async fn fetch_by_id(conn: &mut SqliteConnection, id: i64) -> PhoneNumberResult<Option<UserPhoneNumber>> {
    let row = sqlx::query(&format!("SELECT {PHONE_COLUMNS} FROM user_phone_numbers WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(phone_number_from_row).transpose()
}

/// Apply the singleton rules for the stored row `id`.
///
/// A verified number steals verification from every other owner of the same
/// number and becomes its owner's default when the owner has none. A default
/// number clears the flag on its owner's other numbers.
async fn enforce_flags(conn: &mut SqliteConnection, id: i64) -> PhoneNumberResult<()> {
    let record = fetch_by_id(conn, id)
        .await?
        .ok_or(PhoneNumberError::PhoneNumberNotFound)?;
    let now = Utc::now();
    let mut is_default = record.is_default;

    if record.verified {
        let stolen = sqlx::query(
            "UPDATE user_phone_numbers SET verified = 0, verified_status_updated_at = ? \
             WHERE number = ? AND id != ? AND verified = 1",
        )
        .bind(now)
        .bind(record.number.as_str())
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if stolen.rows_affected() > 0 {
            info!(number = %record.number, owner = %record.owner_email, "verification moved to new owner");
        }

        let defaults: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_phone_numbers WHERE owner_email = ? AND is_default = 1",
        )
        .bind(&record.owner_email)
        .fetch_one(&mut *conn)
        .await?;

        if defaults == 0 {
            sqlx::query("UPDATE user_phone_numbers SET is_default = 1 WHERE id = ?")
                .bind(id)
                .execute(&mut *conn)
                .await?;
            is_default = true;
        }
    }

    if is_default {
        sqlx::query("UPDATE user_phone_numbers SET is_default = 0 WHERE owner_email = ? AND id != ?")
            .bind(&record.owner_email)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Repository for phone number database operations
#[derive(Clone)]
pub struct PhoneNumberRepository {
    pool: SqlitePool,
}

impl PhoneNumberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a phone number and settle the flags
    pub async fn create(&self, request: &CreatePhoneNumberRequest) -> PhoneNumberResult<UserPhoneNumber> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO user_phone_numbers (number, verified, is_default, owner_email, created_at, verified_status_updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(request.number.as_str())
        .bind(request.verified)
        .bind(request.is_default)
        .bind(&request.owner_email)
        .bind(now)
        .bind(request.verified.then_some(now))
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();
        enforce_flags(&mut tx, id).await?;
        let created = fetch_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| PhoneNumberError::DatabaseError("Failed to retrieve created phone number".to_string()))?;

        tx.commit().await?;

        debug!(id, owner = %created.owner_email, "phone number created");
        Ok(created)
    }

    /// Persist `phone_number` and settle the flags.
    ///
    /// `verified_status_updated_at` is stamped whenever `verified` differs
    /// from the stored row.
    pub async fn save(&self, phone_number: &UserPhoneNumber) -> PhoneNumberResult<UserPhoneNumber> {
        let mut tx = self.pool.begin().await?;

        let stored = fetch_by_id(&mut tx, phone_number.id)
            .await?
            .ok_or(PhoneNumberError::PhoneNumberNotFound)?;

        let verified_status_updated_at = if stored.verified != phone_number.verified {
            Some(Utc::now())
        } else {
            stored.verified_status_updated_at
        };

        sqlx::query(
            "UPDATE user_phone_numbers SET number = ?, verified = ?, is_default = ?, owner_email = ?, \
             verified_status_updated_at = ? WHERE id = ?",
        )
        .bind(phone_number.number.as_str())
        .bind(phone_number.verified)
        .bind(phone_number.is_default)
        .bind(&phone_number.owner_email)
        .bind(verified_status_updated_at)
        .bind(phone_number.id)
        .execute(&mut *tx)
        .await?;

        enforce_flags(&mut tx, phone_number.id).await?;
        let saved = fetch_by_id(&mut tx, phone_number.id)
            .await?
            .ok_or(PhoneNumberError::PhoneNumberNotFound)?;

        tx.commit().await?;
        Ok(saved)
    }

    pub async fn find_by_id(&self, id: i64) -> PhoneNumberResult<Option<UserPhoneNumber>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut conn, id).await
    }

    /// Every number of a user, oldest first
    pub async fn all_of_user(&self, owner_email: &str) -> PhoneNumberResult<Vec<UserPhoneNumber>> {
        let rows = sqlx::query(&format!(
            "SELECT {PHONE_COLUMNS} FROM user_phone_numbers WHERE owner_email = ? ORDER BY created_at, id"
        ))
        .bind(owner_email)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(phone_number_from_row).collect()
    }

    /// Verified numbers of a user, oldest first
    pub async fn verified_of_user(&self, owner_email: &str) -> PhoneNumberResult<Vec<UserPhoneNumber>> {
        let rows = sqlx::query(&format!(
            "SELECT {PHONE_COLUMNS} FROM user_phone_numbers WHERE owner_email = ? AND verified = 1 \
             ORDER BY created_at, id"
        ))
        .bind(owner_email)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(phone_number_from_row).collect()
    }

    /// The user's default number, if any
    pub async fn default_of_user(&self, owner_email: &str) -> PhoneNumberResult<Option<UserPhoneNumber>> {
        let row = sqlx::query(&format!(
            "SELECT {PHONE_COLUMNS} FROM user_phone_numbers WHERE owner_email = ? AND is_default = 1 LIMIT 1"
        ))
        .bind(owner_email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(phone_number_from_row).transpose()
    }

    /// Find the row for a number registered by a specific owner
    pub async fn find_for_owner(
        &self,
        owner_email: &str,
        number: &PhoneNumber,
    ) -> PhoneNumberResult<Option<UserPhoneNumber>> {
        let row = sqlx::query(&format!(
            "SELECT {PHONE_COLUMNS} FROM user_phone_numbers WHERE owner_email = ? AND number = ?"
        ))
        .bind(owner_email)
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(phone_number_from_row).transpose()
    }

    pub async fn delete(&self, id: i64) -> PhoneNumberResult<()> {
        let result = sqlx::query("DELETE FROM user_phone_numbers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PhoneNumberError::PhoneNumberNotFound);
        }

        debug!(id, "phone number deleted");
        Ok(())
    }
}
