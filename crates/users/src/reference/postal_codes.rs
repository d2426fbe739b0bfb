//! Postal code formats for countries with numeric codes.
//!
//! Zip codes are stored as integers, so leading zeros are restored from the
//! country's fixed width before matching. Countries with alphanumeric postal
//! codes have no entry and accept any zip code.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// `(country, fixed width, pattern)`; a width of 0 means no zero padding
static POSTAL_FORMATS: &[(&str, usize, &str)] = &[
    ("AT", 4, r"^[1-9]\d{3}$"),
    ("AU", 4, r"^\d{4}$"),
    ("BE", 4, r"^[1-9]\d{3}$"),
    ("BG", 4, r"^[1-9]\d{3}$"),
    ("BR", 8, r"^\d{8}$"),
    ("CH", 4, r"^[1-9]\d{3}$"),
    ("CN", 6, r"^\d{6}$"),
    ("CZ", 5, r"^[1-7]\d{4}$"),
    ("DE", 5, r"^\d{5}$"),
    ("DK", 4, r"^[1-9]\d{3}$"),
    ("ES", 5, r"^(?:0[1-9]|[1-4]\d|5[0-2])\d{3}$"),
    ("FI", 5, r"^\d{5}$"),
    ("FR", 5, r"^(?:0[1-9]|[1-8]\d|9[0-8])\d{3}$"),
    ("GR", 5, r"^[1-8]\d{4}$"),
    ("HU", 4, r"^[1-9]\d{3}$"),
    ("IL", 7, r"^\d{7}$"),
    ("IN", 0, r"^[1-9]\d{5}$"),
    ("IT", 5, r"^\d{5}$"),
    ("JP", 7, r"^\d{7}$"),
    ("KR", 5, r"^\d{5}$"),
    ("MX", 5, r"^\d{5}$"),
    ("NO", 4, r"^\d{4}$"),
    ("NZ", 4, r"^\d{4}$"),
    ("PL", 5, r"^\d{5}$"),
    ("PT", 7, r"^[1-9]\d{6}$"),
    ("RO", 6, r"^\d{6}$"),
    ("RU", 6, r"^[1-6]\d{5}$"),
    ("SE", 5, r"^[1-9]\d{4}$"),
    ("SG", 6, r"^\d{6}$"),
    ("TR", 5, r"^(?:0[1-9]|[1-7]\d|8[01])\d{3}$"),
    ("UA", 5, r"^\d{5}$"),
    ("US", 5, r"^\d{5}$"),
    ("ZA", 4, r"^\d{4}$"),
];

static ZIP_CODES_REGEX: Lazy<HashMap<&'static str, (usize, Regex)>> = Lazy::new(|| {
    POSTAL_FORMATS
        .iter()
        .filter_map(|(country, width, pattern)| {
            Regex::new(pattern).ok().map(|regex| (*country, (*width, regex)))
        })
        .collect()
});

/// Render a stored zip code the way the country writes it
pub fn format_zip_code(country: &str, zip_code: u32) -> String {
    match ZIP_CODES_REGEX.get(country) {
        Some((width, _)) if *width > 0 => format!("{zip_code:0width$}", width = *width),
        _ => zip_code.to_string(),
    }
}

/// `true` when the country has no known format or the zip code matches it
pub fn is_valid_zip_code(country: &str, zip_code: u32) -> bool {
    match ZIP_CODES_REGEX.get(country) {
        Some((_, regex)) => regex.is_match(&format_zip_code(country, zip_code)),
        None => true,
    }
}
