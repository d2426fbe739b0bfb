//! Internal utilities for the account services.
//!
//! This module contains helpers shared by the services: password hashing
//! and input validation.

pub mod password;
pub mod validation;

// Re-export utilities
pub use password::*;
pub use validation::*;
