//! Postal address entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Postal address belonging to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAddress {
    pub id: i64,
    pub user_email: String,
    pub first_name: String,
    pub last_name: String,
    /// Street address, P.O. box, company name, c/o
    pub street_name: String,
    /// Apartment, suite, unit, building, floor, etc.
    pub street_number: String,
    pub city: String,
    pub state: Option<String>,
    /// ISO 3166-1 alpha-2 code
    pub country: String,
    pub zip_code: u32,
    pub timezone: String,
    pub phone_number_id: i64,
    pub default_address: bool,
    pub default_billing_address: bool,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for UserAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.as_deref() {
            Some(state) if !state.is_empty() => write!(
                f,
                "{} {} {}, {}, {}, {}",
                self.street_name, self.street_number, self.city, state, self.zip_code, self.country
            ),
            _ => write!(
                f,
                "{}, {}, {}, {}, {}",
                self.street_name, self.street_number, self.city, self.zip_code, self.country
            ),
        }
    }
}

/// Request for creating a new address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAddressRequest {
    pub first_name: String,
    pub last_name: String,
    pub street_name: String,
    pub street_number: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub zip_code: u32,
    pub timezone: Option<String>,
    pub phone_number_id: i64,
    #[serde(default)]
    pub default_address: bool,
    #[serde(default)]
    pub default_billing_address: bool,
    #[serde(default)]
    pub notes: String,
}

/// Request for updating an existing address
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAddressRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street_name: Option<String>,
    pub street_number: Option<String>,
    pub city: Option<String>,
    /// `Some(None)` clears the state
    pub state: Option<Option<String>>,
    pub country: Option<String>,
    pub zip_code: Option<u32>,
    pub timezone: Option<String>,
    pub phone_number_id: Option<i64>,
    pub notes: Option<String>,
}

impl UpdateAddressRequest {
    pub fn apply_to(&self, address: &mut UserAddress) {
        if let Some(ref first_name) = self.first_name {
            address.first_name = first_name.clone();
        }
        if let Some(ref last_name) = self.last_name {
            address.last_name = last_name.clone();
        }
        if let Some(ref street_name) = self.street_name {
            address.street_name = street_name.clone();
        }
        if let Some(ref street_number) = self.street_number {
            address.street_number = street_number.clone();
        }
        if let Some(ref city) = self.city {
            address.city = city.clone();
        }
        if let Some(ref state) = self.state {
            address.state = state.clone();
        }
        if let Some(ref country) = self.country {
            address.country = country.clone();
        }
        if let Some(zip_code) = self.zip_code {
            address.zip_code = zip_code;
        }
        if let Some(ref timezone) = self.timezone {
            address.timezone = timezone.clone();
        }
        if let Some(phone_number_id) = self.phone_number_id {
            address.phone_number_id = phone_number_id;
        }
        if let Some(ref notes) = self.notes {
            address.notes = notes.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_address(state: Option<&str>) -> UserAddress {
        UserAddress {
            id: 1,
            user_email: "test@nalkins.cloud".to_string(),
            first_name: "Arie".to_string(),
            last_name: "Lev".to_string(),
            street_name: "Main St".to_string(),
            street_number: "12".to_string(),
            city: "Springfield".to_string(),
            state: state.map(str::to_string),
            country: "US".to_string(),
            zip_code: 62704,
            timezone: "UTC".to_string(),
            phone_number_id: 1,
            default_address: false,
            default_billing_address: false,
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_with_state() {
        assert_eq!(
            sample_address(Some("IL")).to_string(),
            "Main St 12 Springfield, IL, 62704, US"
        );
    }

    #[test]
    fn test_display_without_state() {
        assert_eq!(
            sample_address(None).to_string(),
            "Main St, 12, Springfield, 62704, US"
        );
    }

    #[test]
    fn test_update_can_clear_state() {
        let mut address = sample_address(Some("IL"));
        let request = UpdateAddressRequest {
            state: Some(None),
            city: Some("Chicago".to_string()),
            ..Default::default()
        };

        request.apply_to(&mut address);

        assert_eq!(address.state, None);
        assert_eq!(address.city, "Chicago");
        assert_eq!(address.street_name, "Main St");
    }
}
