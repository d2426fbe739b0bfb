//! Static reference tables used by validation

pub mod countries;
pub mod languages;
pub mod postal_codes;
pub mod timezones;

pub use countries::{country_name, is_known_country};
pub use languages::{is_known_language, language_name};
pub use postal_codes::{format_zip_code, is_valid_zip_code};
pub use timezones::is_known_timezone;
