//! Domain entities for the database layer

pub mod address;
pub mod email_verification;
pub mod location;
pub mod phone_number;
pub mod user;

// Re-export all entity types
pub use address::{CreateAddressRequest, UpdateAddressRequest, UserAddress};
pub use email_verification::EmailVerification;
pub use location::{CreateLocationRequest, Location};
pub use phone_number::{CreatePhoneNumberRequest, PhoneNumber, UserPhoneNumber};
pub use user::{CreateUserRequest, Gender, NewUser, UpdateProfileRequest, UpdateUserRequest, User};
