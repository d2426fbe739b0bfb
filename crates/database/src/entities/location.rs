//! Shared location entity definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location shared between users, unique on (address, city, state, country)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub postal_code: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.as_deref() {
            Some(state) => write!(
                f,
                "{}, {}, {}, {} {}",
                self.address, self.city, state, self.country, self.postal_code
            ),
            None => write!(
                f,
                "{}, {}, {} {}",
                self.address, self.city, self.country, self.postal_code
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLocationRequest {
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub postal_code: u32,
}
