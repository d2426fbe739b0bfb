//! Business logic services for user accounts.
//!
//! Services validate input, normalize emails and log what they change;
//! the repositories they wrap own the SQL and the transactional save rules.

pub mod address_service;
pub mod location_service;
pub mod phone_number_service;
pub mod user_service;
pub mod verification_service;

#[cfg(test)]
mod mock_repositories;

use sqlx::SqlitePool;
use std::sync::Arc;
use userext_config::AppConfig;

use crate::mail::Mailer;

// Re-export all services
pub use address_service::AddressService;
pub use location_service::LocationService;
pub use phone_number_service::PhoneNumberService;
pub use user_service::{UserRepo, UserService, UserStats};
pub use verification_service::VerificationService;

/// Every account service sharing one pool
pub struct AccountServices {
    pub users: UserService,
    pub verifications: VerificationService,
    pub phone_numbers: PhoneNumberService,
    pub addresses: AddressService,
    pub locations: LocationService,
}

impl AccountServices {
    pub fn new(pool: SqlitePool, config: &AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            users: UserService::new(pool.clone(), config.users.clone()),
            verifications: VerificationService::new(pool.clone(), mailer, config.verification.clone()),
            phone_numbers: PhoneNumberService::new(pool.clone()),
            addresses: AddressService::new(pool.clone(), config.addresses.clone()),
            locations: LocationService::new(pool),
        }
    }
}
