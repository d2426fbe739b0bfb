//! Database repository implementations

pub mod address_repository;
pub mod email_verification_repository;
pub mod location_repository;
pub mod phone_number_repository;
pub mod user_repository;

// Re-export all repositories for convenience
pub use address_repository::*;
pub use email_verification_repository::*;
pub use location_repository::*;
pub use phone_number_repository::*;
pub use user_repository::*;
