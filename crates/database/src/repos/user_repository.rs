//! User repository for database operations.

use crate::entities::{Gender, NewUser, User};
use crate::types::{UserError, UserResult};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::net::IpAddr;
use tracing::debug;

const USER_COLUMNS: &str = "email, password_hash, user_name, first_name, last_name, gender, birth_date, \
     linkedin, facebook, github, twitter, registration_ip, language, is_staff, is_superuser, is_active, \
     date_created, last_update_date, last_login, last_login_ip";

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

pub(crate) fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    let gender: String = row.try_get("gender")?;
    let registration_ip: Option<String> = row.try_get("registration_ip")?;
    let last_login_ip: Option<String> = row.try_get("last_login_ip")?;

    Ok(User {
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        user_name: row.try_get("user_name")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        gender: Gender::from_code(&gender).unwrap_or_default(),
        birth_date: row.try_get("birth_date")?,
        linkedin: row.try_get("linkedin")?,
        facebook: row.try_get("facebook")?,
        github: row.try_get("github")?,
        twitter: row.try_get("twitter")?,
        registration_ip: registration_ip.and_then(|ip| ip.parse().ok()),
        language: row.try_get("language")?,
        is_staff: row.try_get("is_staff")?,
        is_superuser: row.try_get("is_superuser")?,
        is_active: row.try_get("is_active")?,
        date_created: row.try_get("date_created")?,
        last_update_date: row.try_get("last_update_date")?,
        last_login: row.try_get("last_login")?,
        last_login_ip: last_login_ip.and_then(|ip| ip.parse().ok()),
    })
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find user by email
    pub async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose().map_err(UserError::from)
    }

    /// Insert a new user
    pub async fn create(&self, new_user: &NewUser) -> UserResult<User> {
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (email, password_hash, user_name, first_name, last_name, gender, birth_date, \
             registration_ip, language, is_staff, is_superuser, is_active, date_created, last_update_date) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.user_name)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.gender.as_code())
        .bind(new_user.birth_date)
        .bind(new_user.registration_ip.map(|ip| ip.to_string()))
        .bind(&new_user.language)
        .bind(new_user.is_staff)
        .bind(new_user.is_superuser)
        .bind(new_user.is_active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(email = %new_user.email, "user row inserted");

        self.find_by_email(&new_user.email).await?.ok_or_else(|| {
            UserError::DatabaseError("Failed to retrieve created user".to_string())
        })
    }

    /// Persist every mutable field of an existing user
    pub async fn update(&self, user: &User) -> UserResult<User> {
        let result = sqlx::query(
            "UPDATE users SET user_name = ?, first_name = ?, last_name = ?, gender = ?, birth_date = ?, \
             linkedin = ?, facebook = ?, github = ?, twitter = ?, language = ?, is_staff = ?, \
             is_superuser = ?, is_active = ?, last_update_date = ? WHERE email = ?",
        )
        .bind(&user.user_name)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.gender.as_code())
        .bind(user.birth_date)
        .bind(&user.linkedin)
        .bind(&user.facebook)
        .bind(&user.github)
        .bind(&user.twitter)
        .bind(&user.language)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.is_active)
        .bind(Utc::now())
        .bind(&user.email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound);
        }

        self.find_by_email(&user.email)
            .await?
            .ok_or(UserError::UserNotFound)
    }

    /// Delete user; phone numbers, addresses and verifications cascade
    pub async fn delete(&self, email: &str) -> UserResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound);
        }

        Ok(())
    }

    /// Update user active status
    pub async fn update_active_status(&self, email: &str, is_active: bool) -> UserResult<()> {
        let result = sqlx::query(
            "UPDATE users SET is_active = ?, last_update_date = ? WHERE email = ?",
        )
        .bind(is_active)
        .bind(Utc::now())
        .bind(email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound);
        }

        Ok(())
    }

    /// Update user password hash; `None` marks the password unusable
    pub async fn update_password(&self, email: &str, password_hash: Option<&str>) -> UserResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, last_update_date = ? WHERE email = ?",
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound);
        }

        Ok(())
    }

    /// Record a successful login
    pub async fn update_last_login(
        &self,
        email: &str,
        at: DateTime<Utc>,
        ip: Option<IpAddr>,
    ) -> UserResult<()> {
        let result = sqlx::query(
            "UPDATE users SET last_login = ?, last_login_ip = ?, last_update_date = ? WHERE email = ?",
        )
        .bind(at)
        .bind(ip.map(|ip| ip.to_string()))
        .bind(Utc::now())
        .bind(email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound);
        }

        Ok(())
    }

    /// List users ordered by email
    pub async fn list(&self, limit: u32, offset: u32) -> UserResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY email LIMIT ? OFFSET ?"
        ))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect::<Result<_, _>>().map_err(UserError::from)
    }

    /// Search users by email, first name or last name
    pub async fn search(&self, query: &str, limit: u32) -> UserResult<Vec<User>> {
        let pattern = format!("%{}%", escape_like(query));

        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE email LIKE ?1 ESCAPE '\\' OR first_name LIKE ?1 ESCAPE '\\' OR last_name LIKE ?1 ESCAPE '\\' \
             ORDER BY email LIMIT ?2"
        ))
        .bind(pattern)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect::<Result<_, _>>().map_err(UserError::from)
    }

    /// Check if email exists
    pub async fn email_exists(&self, email: &str) -> UserResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Get user count
    pub async fn count(&self) -> UserResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Get active users count
    pub async fn count_active(&self) -> UserResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Match `query` literally inside a LIKE pattern escaped with `\`
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
