//! Shared types and result types for the database layer

pub mod errors;

// Re-export common types
pub use errors::{AddressError, DatabaseError, PhoneNumberError, UserError, VerificationError};

// Common result types
pub type DatabaseResult<T> = Result<T, DatabaseError>;
pub type UserResult<T> = Result<T, UserError>;
pub type VerificationResult<T> = Result<T, VerificationError>;
pub type PhoneNumberResult<T> = Result<T, PhoneNumberError>;
pub type AddressResult<T> = Result<T, AddressError>;
