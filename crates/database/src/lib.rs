//! Userext Database Crate
//!
//! This crate provides database functionality for the user extension,
//! including connection management, migrations, and repository implementations
//! for users, email verifications, phone numbers, addresses and locations.

use sqlx::SqlitePool;
use userext_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use connection::{prepare_database, DatabaseConnection};
pub use migrations::run_migrations;

// Re-export repositories
pub use repos::{
    AddressRepository, EmailVerificationRepository, LocationRepository, PhoneNumberRepository,
    UserRepository,
};

// Re-export entities
pub use entities::{
    CreateAddressRequest, CreateLocationRequest, CreatePhoneNumberRequest, CreateUserRequest,
    EmailVerification, Gender, Location, NewUser, PhoneNumber, UpdateAddressRequest,
    UpdateProfileRequest, UpdateUserRequest, User, UserAddress, UserPhoneNumber,
};

// Re-export types
pub use types::{
    AddressError, AddressResult, DatabaseError, DatabaseResult, PhoneNumberError,
    PhoneNumberResult, UserError, UserResult, VerificationError, VerificationResult,
};

/// Re-export commonly used types for convenience
pub use sqlx::Pool;

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pool;

    #[tokio::test]
    async fn test_initialize_in_memory_database() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 4,
        };

        let pool = initialize_database(&config).await.unwrap();
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 0);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let (pool, _temp_dir) = create_test_pool().await;

        let result: (bool,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert!(result.0);
    }

    #[tokio::test]
    async fn test_user_delete_cascades() {
        let (pool, _temp_dir) = create_test_pool().await;
        test_support::insert_user(&pool, "a@example.com").await;
        test_support::insert_phone_number(&pool, "a@example.com", "+41524204242").await;

        let verifications = EmailVerificationRepository::new(pool.clone());
        verifications.create("a@example.com", "a@example.com").await.unwrap();

        UserRepository::new(pool.clone()).delete("a@example.com").await.unwrap();

        let phones: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_phone_numbers")
            .fetch_one(&pool)
            .await
            .unwrap();
        let tokens: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM email_verifications")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!((phones, tokens), (0, 0));
    }
}
