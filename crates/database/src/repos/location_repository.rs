//! Repository for shared locations and their user links.

use crate::entities::{CreateLocationRequest, Location};
use crate::types::{AddressError, AddressResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

const LOCATION_COLUMNS: &str = "id, address, city, state, country, postal_code";

fn location_from_row(row: &SqliteRow) -> AddressResult<Location> {
    let postal_code: i64 = row.try_get("postal_code")?;
    let postal_code = u32::try_from(postal_code)
        .map_err(|_| AddressError::DatabaseError(format!("corrupt postal code {postal_code}")))?;

    Ok(Location {
        id: row.try_get("id")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        country: row.try_get("country")?,
        postal_code,
    })
}

#[derive(Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

impl LocationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Return the location matching (address, city, state, country), creating it if needed
    pub async fn get_or_create(&self, request: &CreateLocationRequest) -> AddressResult<Location> {
        let mut tx = self.pool.begin().await?;

        // `IS` so that a missing state matches a stored NULL; the unique
        // index treats NULL states as distinct
        let existing = sqlx::query(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE address = ? AND city = ? AND state IS ? AND country = ?"
        ))
        .bind(&request.address)
        .bind(&request.city)
        .bind(&request.state)
        .bind(&request.country)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = existing {
            tx.commit().await?;
            return location_from_row(&row);
        }

        let result = sqlx::query(
            "INSERT INTO locations (address, city, state, country, postal_code) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&request.address)
        .bind(&request.city)
        .bind(&request.state)
        .bind(&request.country)
        .bind(i64::from(request.postal_code))
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?"))
            .bind(result.last_insert_rowid())
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(address = %request.address, city = %request.city, "location created");

        row.as_ref()
            .map(location_from_row)
            .transpose()?
            .ok_or(AddressError::LocationNotFound)
    }

    pub async fn find_by_id(&self, id: i64) -> AddressResult<Option<Location>> {
        let row = sqlx::query(&format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(location_from_row).transpose()
    }

    /// Link a location to a user; linking twice is a no-op
    pub async fn attach(&self, user_email: &str, location_id: i64) -> AddressResult<()> {
        sqlx::query("INSERT OR IGNORE INTO user_locations (user_email, location_id) VALUES (?, ?)")
            .bind(user_email)
            .bind(location_id)
            .execute(&self.pool)
            .await?;

        debug!(user = %user_email, location_id, "location attached");
        Ok(())
    }

    /// Remove the link between a user and a location, returning whether one existed
    pub async fn detach(&self, user_email: &str, location_id: i64) -> AddressResult<bool> {
        let result = sqlx::query("DELETE FROM user_locations WHERE user_email = ? AND location_id = ?")
            .bind(user_email)
            .bind(location_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn locations_of_user(&self, user_email: &str) -> AddressResult<Vec<Location>> {
        let rows = sqlx::query(
            "SELECT l.id, l.address, l.city, l.state, l.country, l.postal_code FROM locations l \
             JOIN user_locations ul ON ul.location_id = l.id WHERE ul.user_email = ? ORDER BY l.id",
        )
        .bind(user_email)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(location_from_row).collect()
    }
}
