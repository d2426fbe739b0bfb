//! Phone number entity definitions

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use phonenumber::Mode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::PhoneNumberError;

static COUNTRY_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9]\d{0,2}$").expect("valid country code regex"));

/// Phone number in E.164 form, e.g. `+972535251234`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse a number written in international form and store it as E.164.
    ///
    /// Spaces, dashes, dots and parentheses are ignored. The number must be
    /// assigned in its country's numbering plan, not merely well formed.
    pub fn parse(input: &str) -> Result<Self, PhoneNumberError> {
        let compact: String = input
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
            .collect();

        if !compact.starts_with('+') {
            return Err(invalid_number());
        }

        let number = phonenumber::parse(None, &compact).map_err(|_| invalid_number())?;
        if !phonenumber::is_valid(&number) {
            return Err(invalid_number());
        }

        Ok(Self(number.format().mode(Mode::E164).to_string()))
    }

    /// Build a number from a country calling code and a national number,
    /// the way the phone verification form submits it.
    pub fn from_parts(country_code: &str, national_number: &str) -> Result<Self, PhoneNumberError> {
        let national_number = national_number.trim();
        if national_number.is_empty() || !national_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneNumberError::InvalidPhoneNumber(
                "Phone number should contain numbers only".to_string(),
            ));
        }

        let country_code = country_code.trim();
        let country_code = if country_code.starts_with('+') {
            country_code.to_string()
        } else {
            format!("+{country_code}")
        };

        if !COUNTRY_CODE.is_match(&country_code) {
            return Err(PhoneNumberError::InvalidPhoneNumber(
                "Invalid country code".to_string(),
            ));
        }

        // trunk prefixes are stripped by the numbering plan, significant zeros are kept
        Self::parse(&format!("{country_code}{national_number}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn invalid_number() -> PhoneNumberError {
    PhoneNumberError::InvalidPhoneNumber("Invalid phone number".to_string())
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(number: PhoneNumber) -> Self {
        number.0
    }
}

/// Phone number owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPhoneNumber {
    pub id: i64,
    pub number: PhoneNumber,
    pub verified: bool,
    pub is_default: bool,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
    /// Last time `verified` changed
    pub verified_status_updated_at: Option<DateTime<Utc>>,
}

impl fmt::Display for UserPhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.number, f)
    }
}

/// Request for attaching a phone number to a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePhoneNumberRequest {
    pub owner_email: String,
    pub number: PhoneNumber,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_international_numbers() {
        assert_eq!(PhoneNumber::parse("+41524204242").unwrap().as_str(), "+41524204242");
        assert_eq!(
            PhoneNumber::parse(" +1 (201) 555-0123 ").unwrap().as_str(),
            "+12015550123"
        );
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        assert!(PhoneNumber::parse("0535251234").is_err());
        assert!(PhoneNumber::parse("+0535251234").is_err());
        assert!(PhoneNumber::parse("+12345").is_err());
        assert!(PhoneNumber::parse("+1234567890123456").is_err());
        assert!(PhoneNumber::parse("+97253abc1234").is_err());
    }

    #[test]
    fn test_parse_rejects_unassigned_numbers() {
        // no country uses calling code 999
        assert!(PhoneNumber::parse("+999123456789").is_err());
        // NANP area codes never start with 1
        assert!(PhoneNumber::parse("+11234567890").is_err());
    }

    #[test]
    fn test_from_parts_prefixes_plus_and_strips_trunk_prefix() {
        let number = PhoneNumber::from_parts("972", "0535251234").unwrap();
        assert_eq!(number.as_str(), "+972535251234");

        let number = PhoneNumber::from_parts("+1", "2015550123").unwrap();
        assert_eq!(number.as_str(), "+12015550123");
    }

    #[test]
    fn test_from_parts_keeps_significant_leading_zero() {
        let number = PhoneNumber::from_parts("39", "0612345678").unwrap();
        assert_eq!(number.as_str(), "+390612345678");
    }

    #[test]
    fn test_from_parts_requires_digits_only() {
        let error = PhoneNumber::from_parts("+1", "201-555").unwrap_err();
        assert_eq!(
            error,
            PhoneNumberError::InvalidPhoneNumber("Phone number should contain numbers only".to_string())
        );
    }

    #[test]
    fn test_from_parts_rejects_invalid_combination() {
        let error = PhoneNumber::from_parts("+44", "12").unwrap_err();
        assert_eq!(
            error,
            PhoneNumberError::InvalidPhoneNumber("Invalid phone number".to_string())
        );
        assert!(PhoneNumber::from_parts("+0", "535251234").is_err());
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let number: PhoneNumber = serde_json::from_str("\"+41524204242\"").unwrap();
        assert_eq!(number.to_string(), "+41524204242");
        assert!(serde_json::from_str::<PhoneNumber>("\"nope\"").is_err());
    }
}
