//! Error types for the database layer

use thiserror::Error;

/// General database error
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database query error: {0}")]
    QueryError(String),

    #[error("Database migration error: {0}")]
    MigrationError(String),
}

/// User-specific errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserError {
    #[error("User not found")]
    UserNotFound,

    #[error("Email must be set")]
    EmailRequired,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Password hashing failed")]
    PasswordHashingFailed,

    #[error("{0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Email verification errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VerificationError {
    #[error("Email {email} does not belong to user {user}")]
    EmailNotOwned { email: String, user: String },

    #[error("No email verification found for {0}")]
    VerificationNotFound(String),

    #[error("Verification token {0} not found")]
    TokenNotFound(String),

    #[error("UUID {0} expired")]
    TokenExpired(String),

    #[error("email {0} already verified")]
    AlreadyVerified(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Mail delivery failed: {0}")]
    MailDelivery(String),

    #[error("Verification expiry of {0} hours is out of range")]
    InvalidExpiry(i64),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Phone number errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhoneNumberError {
    #[error("Phone number not found")]
    PhoneNumberNotFound,

    #[error("Phone number already registered for this user")]
    DuplicatePhoneNumber,

    #[error("{0}")]
    InvalidPhoneNumber(String),

    #[error("Owner not found")]
    OwnerNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Address and location errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AddressError {
    #[error("Address not found")]
    AddressNotFound,

    #[error("Location not found")]
    LocationNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Phone number not found")]
    PhoneNumberNotFound,

    #[error("{0} has not been verified.")]
    UnverifiedPhoneNumber(String),

    #[error("{0} does not belong to the address owner")]
    ForeignPhoneNumber(String),

    #[error("Zip Code '{zip_code}' is not valid for {country}")]
    InvalidZipCode { zip_code: String, country: String },

    #[error("{0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::QueryError(err.to_string())
    }
}

impl From<sqlx::Error> for UserError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => UserError::UserNotFound,
            ref e if is_unique_violation(e) => UserError::EmailAlreadyExists,
            _ => UserError::DatabaseError(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for VerificationError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            ref e if is_foreign_key_violation(e) => VerificationError::UserNotFound,
            _ => VerificationError::DatabaseError(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for PhoneNumberError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => PhoneNumberError::PhoneNumberNotFound,
            ref e if is_unique_violation(e) => PhoneNumberError::DuplicatePhoneNumber,
            ref e if is_foreign_key_violation(e) => PhoneNumberError::OwnerNotFound,
            _ => PhoneNumberError::DatabaseError(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for AddressError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AddressError::AddressNotFound,
            ref e if is_foreign_key_violation(e) => AddressError::UserNotFound,
            _ => AddressError::DatabaseError(err.to_string()),
        }
    }
}

impl From<UserError> for VerificationError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::UserNotFound => VerificationError::UserNotFound,
            other => VerificationError::DatabaseError(other.to_string()),
        }
    }
}

impl From<PhoneNumberError> for AddressError {
    fn from(err: PhoneNumberError) -> Self {
        match err {
            PhoneNumberError::PhoneNumberNotFound => AddressError::PhoneNumberNotFound,
            PhoneNumberError::OwnerNotFound => AddressError::UserNotFound,
            other => AddressError::DatabaseError(other.to_string()),
        }
    }
}
