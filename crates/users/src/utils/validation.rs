//! Input validation utilities.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;
use userext_database::{AddressError, UserError};

use crate::reference;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

const MAX_EMAIL_LENGTH: usize = 255;
const MAX_USER_NAME_LENGTH: usize = 128;
const MAX_PERSON_NAME_LENGTH: usize = 32;
const MAX_SOCIAL_URL_LENGTH: usize = 255;

/// Lower-case the domain part of an email, leaving the local part untouched
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), UserError> {
    if email.trim().is_empty() {
        return Err(UserError::EmailRequired);
    }

    if email.len() > MAX_EMAIL_LENGTH || !EMAIL_REGEX.is_match(email) {
        return Err(UserError::InvalidEmail);
    }

    Ok(())
}

/// First and last names: letters only, at most 32 characters, empty allowed
pub fn validate_person_name(label: &str, value: &str) -> Result<(), UserError> {
    if value.chars().count() > MAX_PERSON_NAME_LENGTH {
        return Err(UserError::ValidationFailed(format!(
            "{label} must be at most {MAX_PERSON_NAME_LENGTH} characters long"
        )));
    }

    if !value.chars().all(char::is_alphabetic) {
        return Err(UserError::ValidationFailed(format!(
            "{label} must contain alphabetic characters only"
        )));
    }

    Ok(())
}

pub fn validate_user_name(user_name: &str) -> Result<(), UserError> {
    if user_name.chars().count() > MAX_USER_NAME_LENGTH {
        return Err(UserError::ValidationFailed(format!(
            "User name must be at most {MAX_USER_NAME_LENGTH} characters long"
        )));
    }

    Ok(())
}

/// Whole years between `birth_date` and `today`
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// Reject birth dates of users younger than `min_age_years` on `today`
pub fn validate_min_age(birth_date: NaiveDate, min_age_years: u32, today: NaiveDate) -> Result<(), UserError> {
    if birth_date > today {
        return Err(UserError::ValidationFailed(
            "Birth date cannot be in the future".to_string(),
        ));
    }

    if age_on(birth_date, today) < min_age_years as i32 {
        return Err(UserError::ValidationFailed(format!(
            "User must be at least {min_age_years} years old"
        )));
    }

    Ok(())
}

/// Profile links; empty is allowed
pub fn validate_social_url(label: &str, url: &str) -> Result<(), UserError> {
    if url.is_empty() {
        return Ok(());
    }

    if url.len() > MAX_SOCIAL_URL_LENGTH {
        return Err(UserError::ValidationFailed(format!("{label} URL too long")));
    }

    let parsed = Url::parse(url)
        .map_err(|_| UserError::ValidationFailed(format!("Invalid {label} URL")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UserError::ValidationFailed(format!("Invalid {label} URL")));
    }

    Ok(())
}

pub fn validate_language(code: &str) -> Result<(), UserError> {
    if !reference::is_known_language(code) {
        return Err(UserError::ValidationFailed(format!(
            "'{code}' is not a valid language code"
        )));
    }

    Ok(())
}

pub fn validate_country(code: &str) -> Result<(), AddressError> {
    if !reference::is_known_country(code) {
        return Err(AddressError::ValidationFailed(format!(
            "'{code}' is not a valid country code"
        )));
    }

    Ok(())
}

/// Zip code must match the country's postal format when one is known
pub fn validate_zip_code(country: &str, zip_code: u32) -> Result<(), AddressError> {
    validate_country(country)?;

    if !reference::is_valid_zip_code(country, zip_code) {
        return Err(AddressError::InvalidZipCode {
            zip_code: reference::format_zip_code(country, zip_code),
            country: reference::country_name(country).unwrap_or(country).to_string(),
        });
    }

    Ok(())
}

pub fn validate_timezone(name: &str) -> Result<(), AddressError> {
    if !reference::is_known_timezone(name) {
        return Err(AddressError::ValidationFailed(format!(
            "'{name}' is not a valid time zone"
        )));
    }

    Ok(())
}

/// Required text with character bounds, as used by address fields
pub fn validate_length(label: &str, value: &str, min: usize, max: usize) -> Result<(), AddressError> {
    let length = value.trim().chars().count();
    if length < min.max(1) {
        return Err(AddressError::ValidationFailed(format!("{label} is required")));
    }
    if length < min {
        return Err(AddressError::ValidationFailed(format!(
            "{label} must be at least {min} characters long"
        )));
    }
    if length > max {
        return Err(AddressError::ValidationFailed(format!(
            "{label} must be at most {max} characters long"
        )));
    }

    Ok(())
}
