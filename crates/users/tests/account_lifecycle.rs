//! Integration tests for the account services with a real database

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use userext_config::{AppConfig, DatabaseConfig};
use userext_database::initialize_database;
use userext_users::{
    AccountServices, AddressError, CreateAddressRequest, CreateLocationRequest, CreateUserRequest,
    MailError, Mailer, UpdateProfileRequest, VerificationError,
};

#[derive(Debug, Clone)]
struct SentMail {
    subject: String,
    body: String,
    from: String,
    recipients: Vec<String>,
}

/// Keeps every message instead of delivering it
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_mail(
        &self,
        subject: &str,
        body: &str,
        from: &str,
        recipients: &[String],
    ) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(SentMail {
            subject: subject.to_string(),
            body: body.to_string(),
            from: from.to_string(),
            recipients: recipients.to_vec(),
        });
        Ok(())
    }
}

async fn create_services(config: AppConfig) -> (AccountServices, Arc<RecordingMailer>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("accounts.db");

    let config = AppConfig {
        database: DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 4,
        },
        ..config
    };

    let pool = initialize_database(&config.database).await.unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let services = AccountServices::new(pool, &config, mailer.clone());
    (services, mailer, temp_dir)
}

fn address_request(phone_number_id: i64) -> CreateAddressRequest {
    CreateAddressRequest {
        first_name: "Arie".to_string(),
        last_name: "Lev".to_string(),
        street_name: "Herzl".to_string(),
        street_number: "7".to_string(),
        city: "Haifa".to_string(),
        state: None,
        country: "IL".to_string(),
        zip_code: 3303107,
        timezone: Some("Asia/Jerusalem".to_string()),
        phone_number_id,
        default_address: false,
        default_billing_address: false,
        notes: "Ring twice".to_string(),
    }
}

#[tokio::test]
async fn test_signup_and_email_verification() {
    let mut config = AppConfig::default();
    config.verification.expire_hours = Some(48);
    config.verification.from_email = "accounts@nalkins.cloud".to_string();
    let (services, mailer, _temp_dir) = create_services(config).await;

    let user = services
        .users
        .create_user(CreateUserRequest {
            email: "New.User@Nalkins.Cloud".to_string(),
            password: Some("hunter22".to_string()),
            registration_ip: Some("10.1.2.3".parse().unwrap()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(user.email, "New.User@nalkins.cloud");
    assert!(!user.is_active);

    let verification = services
        .verifications
        .create_verification_for(&user.email)
        .await
        .unwrap();
    assert!(services
        .verifications
        .send_default_verification_email(&user.email)
        .await
        .unwrap());

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Verify your email address");
    assert_eq!(sent[0].from, "accounts@nalkins.cloud");
    assert_eq!(sent[0].recipients, vec![user.email.clone()]);
    assert!(sent[0].body.contains(&verification.verification_uuid.to_string()));
    assert!(sent[0].body.contains("valid until"));

    let token = services.verifications.uuid_of_email(&user.email).await.unwrap();
    services
        .verifications
        .verify_str(&token.to_string())
        .await
        .unwrap();

    let user = services.users.get_user(&user.email).await.unwrap();
    assert!(user.is_active);

    // second verify fails and sends nothing further
    assert!(matches!(
        services.verifications.verify(&token).await,
        Err(VerificationError::AlreadyVerified(_))
    ));
    services
        .verifications
        .send_default_verification_email(&user.email)
        .await
        .unwrap();
    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_phone_numbers_and_addresses() {
    let mut config = AppConfig::default();
    config.addresses.enforce_verified_phone = true;
    let (services, _mailer, _temp_dir) = create_services(config).await;

    let user = services
        .users
        .create_user(CreateUserRequest {
            email: "owner@nalkins.cloud".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let phone = services
        .phone_numbers
        .add_from_parts(&user.email, "+972", "0535251234")
        .await
        .unwrap();

    let error = services
        .addresses
        .add_address(&user.email, address_request(phone.id))
        .await
        .unwrap_err();
    assert_eq!(error, AddressError::UnverifiedPhoneNumber("+972535251234".to_string()));

    let phone = services.phone_numbers.set_verified(phone.id, true).await.unwrap();
    assert!(phone.is_default);

    let home = services
        .addresses
        .add_address(&user.email, address_request(phone.id))
        .await
        .unwrap();
    assert!(home.default_address);
    assert_eq!(home.timezone, "Asia/Jerusalem");
    assert_eq!(home.to_string(), "Herzl, 7, Haifa, 3303107, IL");

    let mut billing = address_request(phone.id);
    billing.default_billing_address = true;
    let office = services.addresses.add_address(&user.email, billing).await.unwrap();
    assert!(!office.default_address);

    let default_billing = services
        .addresses
        .default_billing_address_of_user(&user.email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(default_billing.id, office.id);

    // deleting the phone number removes the addresses that reference it
    services.phone_numbers.delete(phone.id).await.unwrap();
    assert!(services.addresses.addresses_of_user(&user.email).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_profile_and_cascading_delete() {
    let (services, _mailer, _temp_dir) = create_services(AppConfig::default()).await;

    let user = services
        .users
        .create_user(CreateUserRequest {
            email: "profile@nalkins.cloud".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let updated = services
        .users
        .update_profile(
            &user.email,
            UpdateProfileRequest {
                first_name: "Dana".to_string(),
                last_name: "Cohen".to_string(),
                birth_date: chrono::NaiveDate::from_ymd_opt(1988, 2, 29),
                language: "he".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.full_name(), "Dana Cohen");

    let phone = services
        .phone_numbers
        .add_from_parts(&user.email, "41", "524204242")
        .await
        .unwrap();
    services
        .addresses
        .add_address(
            &user.email,
            CreateAddressRequest {
                country: "CH".to_string(),
                zip_code: 8001,
                timezone: None,
                ..address_request(phone.id)
            },
        )
        .await
        .unwrap();
    let location = services
        .locations
        .get_or_create(CreateLocationRequest {
            address: "Bahnhofstrasse 1".to_string(),
            city: "Zurich".to_string(),
            state: None,
            country: "CH".to_string(),
            postal_code: 8001,
        })
        .await
        .unwrap();
    services.locations.attach_to_user(&user.email, location.id).await.unwrap();
    services.verifications.create_verification_for(&user.email).await.unwrap();

    services.users.delete_user(&user.email).await.unwrap();

    assert!(services.phone_numbers.all_of_user(&user.email).await.unwrap().is_empty());
    assert!(services.addresses.addresses_of_user(&user.email).await.unwrap().is_empty());
    assert!(services.locations.locations_of_user(&user.email).await.unwrap().is_empty());
    assert!(services
        .verifications
        .verifications_of_user(&user.email)
        .await
        .unwrap()
        .is_empty());
    // shared locations outlive the users linked to them
    assert!(services.locations.find_by_id(location.id).await.is_ok());
}
