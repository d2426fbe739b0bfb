//! Email verification entity definitions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One-time verification token issued for an email address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailVerification {
    /// Database primary key
    pub id: i64,
    /// Email of the owning user
    pub user_email: String,
    /// Address being verified
    pub email: String,
    pub is_verified: bool,
    pub verification_uuid: Uuid,
    pub date_created: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl EmailVerification {
    pub fn verified(&self) -> bool {
        self.is_verified
    }

    /// When the token stops being accepted; `None` when tokens never expire
    pub fn expire_date(&self, expire_after: Option<Duration>) -> Option<DateTime<Utc>> {
        expire_after.and_then(|offset| self.date_created.checked_add_signed(offset))
    }

    /// Check if the token has expired at `now`
    pub fn is_expired(&self, expire_after: Option<Duration>, now: DateTime<Utc>) -> bool {
        match self.expire_date(expire_after) {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

impl fmt::Display for EmailVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Email Verification for User: {}", self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verification_created_at(date_created: DateTime<Utc>) -> EmailVerification {
        EmailVerification {
            id: 1,
            user_email: "test@nalkins.cloud".to_string(),
            email: "test@nalkins.cloud".to_string(),
            is_verified: false,
            verification_uuid: Uuid::new_v4(),
            date_created,
            verified_at: None,
        }
    }

    #[test]
    fn test_never_expires_without_offset() {
        let created = Utc::now() - Duration::days(3650);
        let verification = verification_created_at(created);

        assert!(verification.expire_date(None).is_none());
        assert!(!verification.is_expired(None, Utc::now()));
    }

    #[test]
    fn test_expire_date_adds_offset() {
        let created = Utc::now();
        let verification = verification_created_at(created);

        assert_eq!(
            verification.expire_date(Some(Duration::hours(24))),
            Some(created + Duration::hours(24))
        );
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let created = Utc::now();
        let verification = verification_created_at(created);
        let ttl = Some(Duration::hours(2));

        assert!(!verification.is_expired(ttl, created + Duration::minutes(119)));
        assert!(verification.is_expired(ttl, created + Duration::hours(2)));
        assert!(verification.is_expired(ttl, created + Duration::hours(3)));
    }

    #[test]
    fn test_zero_offset_expires_immediately() {
        let created = Utc::now();
        let verification = verification_created_at(created);

        assert!(verification.is_expired(Some(Duration::zero()), created));
    }

    #[test]
    fn test_display() {
        let verification = verification_created_at(Utc::now());
        assert_eq!(
            verification.to_string(),
            "Email Verification for User: test@nalkins.cloud"
        );
    }
}
