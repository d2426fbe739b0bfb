//! User entity definitions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// User account keyed by its email address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub linkedin: String,
    pub facebook: String,
    pub github: String,
    pub twitter: String,
    pub registration_ip: Option<IpAddr>,
    pub language: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_created: DateTime<Utc>,
    pub last_update_date: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub last_login_ip: Option<IpAddr>,
}

impl User {
    /// First and last name joined by a space, trimmed
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Whether a password has been set for this account
    pub fn has_usable_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

/// Gender choices stored as single-letter codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
    #[default]
    #[serde(rename = "x")]
    NotSpecified,
}

impl Gender {
    pub fn as_code(&self) -> &'static str {
        match self {
            Gender::Male => "m",
            Gender::Female => "f",
            Gender::NotSpecified => "x",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::NotSpecified => "Not specified",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "m" => Some(Gender::Male),
            "f" => Some(Gender::Female),
            "x" => Some(Gender::NotSpecified),
            _ => None,
        }
    }
}

/// Request for creating a new user.
///
/// Flags left as `None` fall back to the defaults of the creating operation
/// (regular user or superuser).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: Option<String>,
    pub user_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub language: Option<String>,
    pub registration_ip: Option<IpAddr>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
}

/// Fully resolved row written by the repository
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub language: String,
    pub registration_ip: Option<IpAddr>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

/// Partial update applied by administrators
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub user_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub language: Option<String>,
    pub linkedin: Option<String>,
    pub facebook: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// Apply the provided fields onto a user
    pub fn apply_to(&self, user: &mut User) {
        if let Some(ref user_name) = self.user_name {
            user.user_name = user_name.clone();
        }
        if let Some(ref first_name) = self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(ref last_name) = self.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(gender) = self.gender {
            user.gender = gender;
        }
        if let Some(birth_date) = self.birth_date {
            user.birth_date = Some(birth_date);
        }
        if let Some(ref language) = self.language {
            user.language = language.clone();
        }
        if let Some(ref linkedin) = self.linkedin {
            user.linkedin = linkedin.clone();
        }
        if let Some(ref facebook) = self.facebook {
            user.facebook = facebook.clone();
        }
        if let Some(ref github) = self.github {
            user.github = github.clone();
        }
        if let Some(ref twitter) = self.twitter {
            user.twitter = twitter.clone();
        }
        if let Some(is_staff) = self.is_staff {
            user.is_staff = is_staff;
        }
        if let Some(is_superuser) = self.is_superuser {
            user.is_superuser = is_superuser;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
    }
}

/// Profile edit submitted by the user; name and birth date are mandatory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub language: String,
}
