//! Email verification workflow.
//!
//! A token is issued for an address the user owns, mailed to that address,
//! and verifying it activates the account. Tokens optionally expire a fixed
//! number of hours after they were issued.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, warn};
use userext_config::VerificationConfig;
use userext_database::{
    EmailVerification, EmailVerificationRepository, User, UserRepository, VerificationError,
    VerificationResult,
};
use uuid::Uuid;

use crate::mail::Mailer;
use crate::utils::normalize_email;

pub struct VerificationService {
    verifications: EmailVerificationRepository,
    users: UserRepository,
    mailer: Arc<dyn Mailer>,
    config: VerificationConfig,
}

impl VerificationService {
    pub fn new(pool: SqlitePool, mailer: Arc<dyn Mailer>, config: VerificationConfig) -> Self {
        Self {
            verifications: EmailVerificationRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            mailer,
            config,
        }
    }

    /// Lifetime of a token; `None` means tokens never expire
    pub fn expire_after(&self) -> VerificationResult<Option<Duration>> {
        match self.config.expire_hours {
            None => Ok(None),
            Some(hours) => Duration::try_hours(hours)
                .filter(|_| hours >= 0)
                .map(Some)
                .ok_or(VerificationError::InvalidExpiry(hours)),
        }
    }

    pub fn expire_date(&self, verification: &EmailVerification) -> VerificationResult<Option<DateTime<Utc>>> {
        Ok(verification.expire_date(self.expire_after()?))
    }

    pub fn is_expired(&self, verification: &EmailVerification, now: DateTime<Utc>) -> VerificationResult<bool> {
        Ok(verification.is_expired(self.expire_after()?, now))
    }

    /// Issue a token for `email`, which must be the user's own address
    pub async fn create_verification(&self, user: &User, email: &str) -> VerificationResult<EmailVerification> {
        let email = normalize_email(email);
        if email != user.email {
            return Err(VerificationError::EmailNotOwned {
                email,
                user: user.email.clone(),
            });
        }

        let verification = self.verifications.create(&user.email, &email).await?;
        info!(email = %email, "issued email verification");
        Ok(verification)
    }

    /// Issue a token for the user's own address
    pub async fn create_verification_for(&self, user_email: &str) -> VerificationResult<EmailVerification> {
        let user = self
            .users
            .find_by_email(&normalize_email(user_email))
            .await?
            .ok_or(VerificationError::UserNotFound)?;

        self.create_verification(&user, &user.email).await
    }

    /// Mail the pending verification of `to`.
    ///
    /// Nothing is sent when the address is already verified; both cases
    /// return `true`.
    pub async fn send_verification_email(
        &self,
        subject: &str,
        body: &str,
        from: &str,
        to: &str,
    ) -> VerificationResult<bool> {
        let verification = self.latest_for(to).await?;

        if verification.is_verified {
            debug!(email = %verification.email, "email already verified, not sending");
            return Ok(true);
        }

        self.mailer
            .send_mail(subject, body, from, &[verification.email.clone()])
            .await
            .map_err(|e| {
                warn!(email = %verification.email, error = %e, "verification email not delivered");
                VerificationError::MailDelivery(e.to_string())
            })?;

        info!(email = %verification.email, "verification email sent");
        Ok(true)
    }

    /// Mail the pending token of `to` using the configured subject and sender
    pub async fn send_default_verification_email(&self, to: &str) -> VerificationResult<bool> {
        let verification = self.latest_for(to).await?;
        let body = verification_body(&verification, self.expire_date(&verification)?);

        self.send_verification_email(&self.config.subject, &body, &self.config.from_email, to)
            .await
    }

    /// Token of the most recent verification issued for `email`
    pub async fn uuid_of_email(&self, email: &str) -> VerificationResult<Uuid> {
        Ok(self.latest_for(email).await?.verification_uuid)
    }

    pub async fn verifications_of_user(&self, user_email: &str) -> VerificationResult<Vec<EmailVerification>> {
        self.verifications.list_for_user(&normalize_email(user_email)).await
    }

    /// Verify a token received from the user
    pub async fn verify(&self, token: &Uuid) -> VerificationResult<EmailVerification> {
        self.verify_at(token, Utc::now()).await
    }

    /// Parse and verify a token given as text
    pub async fn verify_str(&self, token: &str) -> VerificationResult<EmailVerification> {
        let uuid = Uuid::parse_str(token.trim())
            .map_err(|_| VerificationError::TokenNotFound(token.to_string()))?;
        self.verify(&uuid).await
    }

    /// Verify `token` as of `now`, activating the owning user
    pub async fn verify_at(&self, token: &Uuid, now: DateTime<Utc>) -> VerificationResult<EmailVerification> {
        let verification = self
            .verifications
            .find_by_uuid(token)
            .await?
            .ok_or_else(|| VerificationError::TokenNotFound(token.to_string()))?;

        if self.is_expired(&verification, now)? {
            warn!(email = %verification.email, "expired verification token used");
            return Err(VerificationError::TokenExpired(token.to_string()));
        }

        if verification.is_verified {
            return Err(VerificationError::AlreadyVerified(verification.email));
        }

        self.verifications.mark_verified(&verification, now).await
    }

    async fn latest_for(&self, email: &str) -> VerificationResult<EmailVerification> {
        let email = normalize_email(email);
        self.verifications
            .find_latest_by_email(&email)
            .await?
            .ok_or(VerificationError::VerificationNotFound(email))
    }
}

fn verification_body(verification: &EmailVerification, expires: Option<DateTime<Utc>>) -> String {
    let mut body = format!(
        "Please confirm {} by entering the following verification token:\n\n{}\n",
        verification.email, verification.verification_uuid
    );
    if let Some(expires) = expires {
        body.push_str(&format!("\nThe token is valid until {}.\n", expires.to_rfc3339()));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::{MailError, MockMailer};
    use userext_database::{initialize_database, CreateUserRequest};
    use userext_config::{DatabaseConfig, UsersConfig};

    use crate::services::UserService;

    async fn setup(mailer: MockMailer, expire_hours: Option<i64>) -> (VerificationService, User) {
        let pool = initialize_database(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
        .unwrap();

        let user = UserService::new(pool.clone(), UsersConfig::default())
            .create_user(CreateUserRequest {
                email: "test@nalkins.cloud".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let config = VerificationConfig {
            expire_hours,
            ..Default::default()
        };
        (VerificationService::new(pool, Arc::new(mailer), config), user)
    }

    #[tokio::test]
    async fn test_email_must_belong_to_user() {
        let (service, user) = setup(MockMailer::new(), None).await;

        let result = service.create_verification(&user, "other@nalkins.cloud").await;
        assert!(matches!(result, Err(VerificationError::EmailNotOwned { .. })));

        let verification = service.create_verification(&user, "test@NALKINS.cloud").await.unwrap();
        assert_eq!(verification.email, "test@nalkins.cloud");
        assert_eq!(
            service.uuid_of_email("test@nalkins.cloud").await.unwrap(),
            verification.verification_uuid
        );
    }

    #[tokio::test]
    async fn test_send_only_when_unverified() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_mail()
            .withf(|subject, _body, from, recipients| {
                subject.to_string() == "Verify"
                    && from.to_string() == "no-reply@nalkins.cloud"
                    && recipients.len() == 1
                    && recipients[0] == "test@nalkins.cloud"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        let (service, user) = setup(mailer, None).await;

        let verification = service.create_verification_for(&user.email).await.unwrap();
        assert!(service
            .send_verification_email("Verify", "body", "no-reply@nalkins.cloud", &user.email)
            .await
            .unwrap());

        service.verify(&verification.verification_uuid).await.unwrap();
        assert!(service
            .send_verification_email("Verify", "body", "no-reply@nalkins.cloud", &user.email)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_send_without_verification() {
        let (service, _user) = setup(MockMailer::new(), None).await;

        let result = service
            .send_verification_email("Verify", "body", "no-reply@nalkins.cloud", "test@nalkins.cloud")
            .await;
        assert_eq!(
            result.unwrap_err(),
            VerificationError::VerificationNotFound("test@nalkins.cloud".to_string())
        );
    }

    #[tokio::test]
    async fn test_mail_failure_surfaces() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_mail()
            .returning(|_, _, _, _| Err(MailError::Transport("connection refused".to_string())));
        let (service, user) = setup(mailer, None).await;

        service.create_verification_for(&user.email).await.unwrap();
        let result = service.send_default_verification_email(&user.email).await;
        assert!(matches!(result, Err(VerificationError::MailDelivery(_))));
    }

    #[tokio::test]
    async fn test_verify_activates_once() {
        let (service, user) = setup(MockMailer::new(), Some(24)).await;
        assert!(!user.is_active);

        let verification = service.create_verification_for(&user.email).await.unwrap();
        let verified = service.verify(&verification.verification_uuid).await.unwrap();
        assert!(verified.is_verified);
        assert!(verified.verified_at.is_some());

        let activated = service.users.find_by_email(&user.email).await.unwrap().unwrap();
        assert!(activated.is_active);

        let again = service.verify(&verification.verification_uuid).await;
        assert_eq!(
            again.unwrap_err().to_string(),
            "email test@nalkins.cloud already verified"
        );
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let (service, user) = setup(MockMailer::new(), Some(2)).await;

        let verification = service.create_verification_for(&user.email).await.unwrap();
        let expires = service.expire_date(&verification).unwrap().unwrap();
        assert_eq!(expires, verification.date_created + Duration::hours(2));

        let result = service.verify_at(&verification.verification_uuid, expires).await;
        assert_eq!(
            result.unwrap_err(),
            VerificationError::TokenExpired(verification.verification_uuid.to_string())
        );

        let inactive = service.users.find_by_email(&user.email).await.unwrap().unwrap();
        assert!(!inactive.is_active);
    }

    #[tokio::test]
    async fn test_tokens_never_expire_without_offset() {
        let (service, user) = setup(MockMailer::new(), None).await;

        let verification = service.create_verification_for(&user.email).await.unwrap();
        assert!(service.expire_date(&verification).unwrap().is_none());

        let far_future = verification.date_created + Duration::days(3650);
        assert!(service.verify_at(&verification.verification_uuid, far_future).await.is_ok());
    }

    #[tokio::test]
    async fn test_out_of_range_expiry_is_an_error() {
        let (service, user) = setup(MockMailer::new(), Some(i64::MAX / 1000)).await;

        let verification = service.create_verification_for(&user.email).await.unwrap();
        assert_eq!(
            service.expire_after(),
            Err(VerificationError::InvalidExpiry(i64::MAX / 1000))
        );
        assert!(service.expire_date(&verification).is_err());
        assert_eq!(
            service.verify(&verification.verification_uuid).await.unwrap_err(),
            VerificationError::InvalidExpiry(i64::MAX / 1000)
        );
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (service, _user) = setup(MockMailer::new(), None).await;

        assert!(matches!(
            service.verify(&Uuid::new_v4()).await,
            Err(VerificationError::TokenNotFound(_))
        ));
        assert!(matches!(
            service.verify_str("not-a-uuid").await,
            Err(VerificationError::TokenNotFound(_))
        ));
    }

    #[test]
    fn test_body_mentions_token() {
        let verification = EmailVerification {
            id: 1,
            user_email: "a@example.com".to_string(),
            email: "a@example.com".to_string(),
            is_verified: false,
            verification_uuid: Uuid::nil(),
            date_created: Utc::now(),
            verified_at: None,
        };

        let body = verification_body(&verification, None);
        assert!(body.contains(&Uuid::nil().to_string()));
        assert!(!body.contains("valid until"));
    }
}
