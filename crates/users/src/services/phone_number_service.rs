//! Phone numbers attached to users.

use sqlx::SqlitePool;
use tracing::info;
use userext_database::{
    CreatePhoneNumberRequest, PhoneNumber, PhoneNumberError, PhoneNumberRepository,
    PhoneNumberResult, UserPhoneNumber,
};

use crate::utils::normalize_email;

pub struct PhoneNumberService {
    phone_numbers: PhoneNumberRepository,
}

impl PhoneNumberService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            phone_numbers: PhoneNumberRepository::new(pool),
        }
    }

    pub async fn add_phone_number(&self, mut request: CreatePhoneNumberRequest) -> PhoneNumberResult<UserPhoneNumber> {
        request.owner_email = normalize_email(&request.owner_email);
        let phone_number = self.phone_numbers.create(&request).await?;

        info!(
            owner = %phone_number.owner_email,
            number = %phone_number.number,
            verified = phone_number.verified,
            "added phone number"
        );
        Ok(phone_number)
    }

    /// Add an unverified number submitted as country code plus national number
    pub async fn add_from_parts(
        &self,
        owner_email: &str,
        country_code: &str,
        national_number: &str,
    ) -> PhoneNumberResult<UserPhoneNumber> {
        let number = PhoneNumber::from_parts(country_code, national_number)?;

        self.add_phone_number(CreatePhoneNumberRequest {
            owner_email: owner_email.to_string(),
            number,
            verified: false,
            is_default: false,
        })
        .await
    }

    pub async fn find_by_id(&self, id: i64) -> PhoneNumberResult<UserPhoneNumber> {
        self.phone_numbers
            .find_by_id(id)
            .await?
            .ok_or(PhoneNumberError::PhoneNumberNotFound)
    }

    /// Mark a number verified or unverified.
    ///
    /// Verifying takes the number away from any other owner and makes it the
    /// owner's default when they have none.
    pub async fn set_verified(&self, id: i64, verified: bool) -> PhoneNumberResult<UserPhoneNumber> {
        let mut phone_number = self.find_by_id(id).await?;
        phone_number.verified = verified;

        let saved = self.phone_numbers.save(&phone_number).await?;
        info!(number = %saved.number, owner = %saved.owner_email, verified, "changed phone verification");
        Ok(saved)
    }

    /// Make a number its owner's only default
    pub async fn set_default(&self, id: i64) -> PhoneNumberResult<UserPhoneNumber> {
        let mut phone_number = self.find_by_id(id).await?;
        phone_number.is_default = true;

        self.phone_numbers.save(&phone_number).await
    }

    pub async fn delete(&self, id: i64) -> PhoneNumberResult<()> {
        self.phone_numbers.delete(id).await
    }

    pub async fn all_of_user(&self, owner_email: &str) -> PhoneNumberResult<Vec<UserPhoneNumber>> {
        self.phone_numbers.all_of_user(&normalize_email(owner_email)).await
    }

    pub async fn verified_of_user(&self, owner_email: &str) -> PhoneNumberResult<Vec<UserPhoneNumber>> {
        self.phone_numbers.verified_of_user(&normalize_email(owner_email)).await
    }

    /// Just the numbers of the user's verified phone numbers
    pub async fn verified_number_list(&self, owner_email: &str) -> PhoneNumberResult<Vec<PhoneNumber>> {
        Ok(self
            .verified_of_user(owner_email)
            .await?
            .into_iter()
            .map(|phone_number| phone_number.number)
            .collect())
    }

    pub async fn default_of_user(&self, owner_email: &str) -> PhoneNumberResult<Option<UserPhoneNumber>> {
        self.phone_numbers.default_of_user(&normalize_email(owner_email)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use userext_config::{DatabaseConfig, UsersConfig};
    use userext_database::{initialize_database, CreateUserRequest};

    use crate::services::UserService;

    async fn setup() -> PhoneNumberService {
        let pool = initialize_database(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
        .unwrap();

        let users = UserService::new(pool.clone(), UsersConfig::default());
        for email in ["a@example.com", "b@example.com"] {
            users
                .create_user(CreateUserRequest {
                    email: email.to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        PhoneNumberService::new(pool)
    }

    #[tokio::test]
    async fn test_add_from_parts() {
        let service = setup().await;

        let phone = service.add_from_parts("a@example.com", "972", "0535251234").await.unwrap();
        assert_eq!(phone.number.as_str(), "+972535251234");
        assert!(!phone.verified);

        let error = service.add_from_parts("a@example.com", "+972", "05352-51234").await.unwrap_err();
        assert_eq!(error.to_string(), "Phone number should contain numbers only");
    }

    #[tokio::test]
    async fn test_verify_sets_default_and_list() {
        let service = setup().await;

        let first = service.add_from_parts("a@example.com", "41", "524204242").await.unwrap();
        let second = service.add_from_parts("a@example.com", "972", "535251234").await.unwrap();
        assert!(service.default_of_user("a@example.com").await.unwrap().is_none());

        let first = service.set_verified(first.id, true).await.unwrap();
        assert!(first.is_default);
        assert!(first.verified_status_updated_at.is_some());

        service.set_verified(second.id, true).await.unwrap();
        let numbers = service.verified_number_list("a@example.com").await.unwrap();
        let numbers: Vec<_> = numbers.iter().map(PhoneNumber::as_str).collect();
        assert_eq!(numbers, vec!["+41524204242", "+972535251234"]);
        assert_eq!(service.default_of_user("a@example.com").await.unwrap().map(|p| p.id), Some(first.id));
    }

    #[tokio::test]
    async fn test_set_default_moves_flag() {
        let service = setup().await;

        let first = service.add_from_parts("a@example.com", "41", "524204242").await.unwrap();
        let second = service.add_from_parts("a@example.com", "972", "535251234").await.unwrap();

        service.set_default(first.id).await.unwrap();
        service.set_default(second.id).await.unwrap();

        let defaults: Vec<_> = service
            .all_of_user("a@example.com")
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.is_default)
            .map(|p| p.id)
            .collect();
        assert_eq!(defaults, vec![second.id]);
    }

    #[tokio::test]
    async fn test_number_verified_for_single_owner() {
        let service = setup().await;

        let mine = service.add_from_parts("a@example.com", "41", "524204242").await.unwrap();
        let theirs = service.add_from_parts("b@example.com", "41", "524204242").await.unwrap();

        service.set_verified(mine.id, true).await.unwrap();
        service.set_verified(theirs.id, true).await.unwrap();

        assert!(service.verified_of_user("a@example.com").await.unwrap().is_empty());
        assert_eq!(service.verified_of_user("b@example.com").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_number() {
        let service = setup().await;
        assert_eq!(
            service.set_verified(99, true).await.unwrap_err(),
            PhoneNumberError::PhoneNumberNotFound
        );
        assert_eq!(service.delete(99).await.unwrap_err(), PhoneNumberError::PhoneNumberNotFound);
    }
}
