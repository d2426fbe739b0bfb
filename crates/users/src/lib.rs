//! # Userext Users Crate
//!
//! Account services built on top of `userext-database`: user management,
//! email verification, phone numbers, postal addresses and shared locations.
//!
//! ## Architecture
//!
//! - **Services**: validation and business rules, one service per entity
//! - **Mail**: the [`Mailer`] seam used to deliver verification emails
//! - **Reference**: static ISO language/country, postal code and time zone tables
//! - **Utils**: password hashing and input validation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use userext_users::{AccountServices, ConsoleMailer, CreateUserRequest};
//!
//! # async fn run(pool: sqlx::SqlitePool, config: userext_config::AppConfig) -> anyhow::Result<()> {
//! let services = AccountServices::new(pool, &config, Arc::new(ConsoleMailer));
//! let user = services
//!     .users
//!     .create_user(CreateUserRequest {
//!         email: "someone@example.com".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//! let verification = services.verifications.create_verification_for(&user.email).await?;
//! services.verifications.verify(&verification.verification_uuid).await?;
//! # Ok(())
//! # }
//! ```

pub mod mail;
pub mod reference;
pub mod services;
pub mod utils;

// Re-export database types
pub use userext_database::{
    AddressError, AddressResult, CreateAddressRequest, CreateLocationRequest,
    CreatePhoneNumberRequest, CreateUserRequest, EmailVerification, Gender, Location, PhoneNumber,
    PhoneNumberError, PhoneNumberResult, UpdateAddressRequest, UpdateProfileRequest,
    UpdateUserRequest, User, UserAddress, UserError, UserPhoneNumber, UserResult,
    VerificationError, VerificationResult,
};

// Re-export main types for convenience
pub use mail::{mailer_from_config, ConsoleMailer, MailError, Mailer, SmtpMailer};
pub use services::{
    AccountServices, AddressService, LocationService, PhoneNumberService, UserService, UserStats,
    VerificationService,
};
