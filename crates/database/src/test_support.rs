//! Fixtures shared by the repository tests

use crate::{prepare_database, run_migrations};
use chrono::Utc;
use sqlx::SqlitePool;
use tempfile::TempDir;
use userext_config::DatabaseConfig;

/// Fresh migrated database in a temporary directory
pub(crate) async fn create_test_pool() -> (SqlitePool, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let config = DatabaseConfig {
        url: format!("sqlite://{}", db_path.display()),
        max_connections: 2,
    };

    let pool = prepare_database(&config).await.unwrap();
    run_migrations(&pool).await.unwrap();
    (pool, temp_dir)
}

pub(crate) async fn insert_user(pool: &SqlitePool, email: &str) {
    let now = Utc::now();
    sqlx::query("INSERT INTO users (email, date_created, last_update_date) VALUES (?, ?, ?)")
        .bind(email)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
}

pub(crate) async fn insert_phone_number(pool: &SqlitePool, owner_email: &str, number: &str) -> i64 {
    sqlx::query("INSERT INTO user_phone_numbers (number, owner_email, created_at) VALUES (?, ?, ?)")
        .bind(number)
        .bind(owner_email)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}
