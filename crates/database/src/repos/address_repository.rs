//! Repository for user postal addresses.

use crate::entities::{CreateAddressRequest, UserAddress};
use crate::types::{AddressError, AddressResult};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

const ADDRESS_COLUMNS: &str = "id, user_email, first_name, last_name, street_name, street_number, city, \
     state, country, zip_code, timezone, phone_number_id, default_address, default_billing_address, notes, created_at";

fn address_from_row(row: &SqliteRow) -> AddressResult<UserAddress> {
    let zip_code: i64 = row.try_get("zip_code")?;
    let zip_code = u32::try_from(zip_code)
        .map_err(|_| AddressError::DatabaseError(format!("corrupt zip code {zip_code}")))?;

    Ok(UserAddress {
        id: row.try_get("id")?,
        user_email: row.try_get("user_email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        street_name: row.try_get("street_name")?,
        street_number: row.try_get("street_number")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        country: row.try_get("country")?,
        zip_code,
        timezone: row.try_get("timezone")?,
        phone_number_id: row.try_get("phone_number_id")?,
        default_address: row.try_get("default_address")?,
        default_billing_address: row.try_get("default_billing_address")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn fetch_by_id(conn: &mut SqliteConnection, id: i64) -> AddressResult<Option<UserAddress>> {
    let row = sqlx::query(&format!("SELECT {ADDRESS_COLUMNS} FROM user_addresses WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(address_from_row).transpose()
}

/// Clear the default flags on the owner's other addresses where this one holds them
async fn enforce_flags(conn: &mut SqliteConnection, address: &UserAddress) -> AddressResult<()> {
    if address.default_address {
        sqlx::query("UPDATE user_addresses SET default_address = 0 WHERE user_email = ? AND id != ?")
            .bind(&address.user_email)
            .bind(address.id)
            .execute(&mut *conn)
            .await?;
    }

    if address.default_billing_address {
        sqlx::query("UPDATE user_addresses SET default_billing_address = 0 WHERE user_email = ? AND id != ?")
            .bind(&address.user_email)
            .bind(address.id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Repository for address database operations
#[derive(Clone)]
pub struct AddressRepository {
    pool: SqlitePool,
}

impl AddressRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an address for `user_email`.
    ///
    /// An address created while the user has no default address becomes the default.
    pub async fn create(
        &self,
        user_email: &str,
        request: &CreateAddressRequest,
        timezone: &str,
    ) -> AddressResult<UserAddress> {
        let mut tx = self.pool.begin().await?;

        let defaults: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_addresses WHERE user_email = ? AND default_address = 1",
        )
        .bind(user_email)
        .fetch_one(&mut *tx)
        .await?;
        let default_address = request.default_address || defaults == 0;

        let result = sqlx::query(
            "INSERT INTO user_addresses (user_email, first_name, last_name, street_name, street_number, city, \
             state, country, zip_code, timezone, phone_number_id, default_address, default_billing_address, notes, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_email)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.street_name)
        .bind(&request.street_number)
        .bind(&request.city)
        .bind(&request.state)
        .bind(&request.country)
        .bind(i64::from(request.zip_code))
        .bind(timezone)
        .bind(request.phone_number_id)
        .bind(default_address)
        .bind(request.default_billing_address)
        .bind(&request.notes)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let created = fetch_by_id(&mut tx, result.last_insert_rowid())
            .await?
            .ok_or_else(|| AddressError::DatabaseError("Failed to retrieve created address".to_string()))?;
        enforce_flags(&mut tx, &created).await?;

        tx.commit().await?;

        debug!(id = created.id, user = %user_email, default = created.default_address, "address created");
        Ok(created)
    }

    /// Persist every mutable field of an address and settle the default flags
    pub async fn save(&self, address: &UserAddress) -> AddressResult<UserAddress> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE user_addresses SET first_name = ?, last_name = ?, street_name = ?, street_number = ?, \
             city = ?, state = ?, country = ?, zip_code = ?, timezone = ?, phone_number_id = ?, \
             default_address = ?, default_billing_address = ?, notes = ? WHERE id = ?",
        )
        .bind(&address.first_name)
        .bind(&address.last_name)
        .bind(&address.street_name)
        .bind(&address.street_number)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.country)
        .bind(i64::from(address.zip_code))
        .bind(&address.timezone)
        .bind(address.phone_number_id)
        .bind(address.default_address)
        .bind(address.default_billing_address)
        .bind(&address.notes)
        .bind(address.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AddressError::AddressNotFound);
        }

        enforce_flags(&mut tx, address).await?;
        let saved = fetch_by_id(&mut tx, address.id)
            .await?
            .ok_or(AddressError::AddressNotFound)?;

        tx.commit().await?;
        Ok(saved)
    }

    pub async fn find_by_id(&self, id: i64) -> AddressResult<Option<UserAddress>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut conn, id).await
    }

    /// Every address of a user, oldest first
    pub async fn all_of_user(&self, user_email: &str) -> AddressResult<Vec<UserAddress>> {
        let rows = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM user_addresses WHERE user_email = ? ORDER BY created_at, id"
        ))
        .bind(user_email)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(address_from_row).collect()
    }

    pub async fn default_of_user(&self, user_email: &str) -> AddressResult<Option<UserAddress>> {
        let row = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM user_addresses WHERE user_email = ? AND default_address = 1 LIMIT 1"
        ))
        .bind(user_email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(address_from_row).transpose()
    }

    pub async fn default_billing_of_user(&self, user_email: &str) -> AddressResult<Option<UserAddress>> {
        let row = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM user_addresses WHERE user_email = ? AND default_billing_address = 1 LIMIT 1"
        ))
        .bind(user_email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(address_from_row).transpose()
    }

    pub async fn delete(&self, id: i64) -> AddressResult<()> {
        let result = sqlx::query("DELETE FROM user_addresses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AddressError::AddressNotFound);
        }

        Ok(())
    }
}
