//! Postal addresses of users.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use userext_config::AddressConfig;
use userext_database::{
    AddressError, AddressRepository, AddressResult, CreateAddressRequest, PhoneNumberRepository,
    UpdateAddressRequest, UserAddress,
};

use crate::utils::{normalize_email, validate_length, validate_timezone, validate_zip_code};

const DEFAULT_TIMEZONE: &str = "UTC";
const MAX_FIELD_LENGTH: usize = 128;

pub struct AddressService {
    addresses: AddressRepository,
    phone_numbers: PhoneNumberRepository,
    config: AddressConfig,
}

impl AddressService {
    pub fn new(pool: SqlitePool, config: AddressConfig) -> Self {
        Self {
            addresses: AddressRepository::new(pool.clone()),
            phone_numbers: PhoneNumberRepository::new(pool),
            config,
        }
    }

    /// Validate and store a new address; it becomes the default when the user has none
    pub async fn add_address(&self, user_email: &str, request: CreateAddressRequest) -> AddressResult<UserAddress> {
        let user_email = normalize_email(user_email);
        let timezone = request
            .timezone
            .clone()
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

        let candidate = UserAddress {
            id: 0,
            user_email: user_email.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            street_name: request.street_name.clone(),
            street_number: request.street_number.clone(),
            city: request.city.clone(),
            state: request.state.clone(),
            country: request.country.clone(),
            zip_code: request.zip_code,
            timezone,
            phone_number_id: request.phone_number_id,
            default_address: request.default_address,
            default_billing_address: request.default_billing_address,
            notes: request.notes.clone(),
            created_at: Utc::now(),
        };
        self.clean(&candidate).await?;

        let address = self
            .addresses
            .create(&user_email, &request, &candidate.timezone)
            .await?;

        info!(id = address.id, user = %user_email, default = address.default_address, "added address");
        Ok(address)
    }

    pub async fn update_address(&self, id: i64, request: UpdateAddressRequest) -> AddressResult<UserAddress> {
        let mut address = self.find_by_id(id).await?;
        request.apply_to(&mut address);
        self.clean(&address).await?;

        self.addresses.save(&address).await
    }

    pub async fn set_default_address(&self, id: i64) -> AddressResult<UserAddress> {
        let mut address = self.find_by_id(id).await?;
        address.default_address = true;
        self.addresses.save(&address).await
    }

    pub async fn set_default_billing_address(&self, id: i64) -> AddressResult<UserAddress> {
        let mut address = self.find_by_id(id).await?;
        address.default_billing_address = true;
        self.addresses.save(&address).await
    }

    pub async fn delete_address(&self, id: i64) -> AddressResult<()> {
        self.addresses.delete(id).await?;
        info!(id, "deleted address");
        Ok(())
    }

    pub async fn find_by_id(&self, id: i64) -> AddressResult<UserAddress> {
        self.addresses
            .find_by_id(id)
            .await?
            .ok_or(AddressError::AddressNotFound)
    }

    pub async fn addresses_of_user(&self, user_email: &str) -> AddressResult<Vec<UserAddress>> {
        self.addresses.all_of_user(&normalize_email(user_email)).await
    }

    pub async fn default_address_of_user(&self, user_email: &str) -> AddressResult<Option<UserAddress>> {
        self.addresses.default_of_user(&normalize_email(user_email)).await
    }

    pub async fn default_billing_address_of_user(&self, user_email: &str) -> AddressResult<Option<UserAddress>> {
        self.addresses
            .default_billing_of_user(&normalize_email(user_email))
            .await
    }

    /// Field, zip code and phone number checks run before every write
    async fn clean(&self, address: &UserAddress) -> AddressResult<()> {
        validate_length("First name", &address.first_name, 2, MAX_FIELD_LENGTH)?;
        validate_length("Last name", &address.last_name, 2, MAX_FIELD_LENGTH)?;
        validate_length("Street name", &address.street_name, 1, MAX_FIELD_LENGTH)?;
        validate_length("Street number", &address.street_number, 1, MAX_FIELD_LENGTH)?;
        validate_length("City", &address.city, 1, MAX_FIELD_LENGTH)?;
        if let Some(state) = address.state.as_deref() {
            if state.chars().count() > MAX_FIELD_LENGTH {
                return Err(AddressError::ValidationFailed(format!(
                    "State must be at most {MAX_FIELD_LENGTH} characters long"
                )));
            }
        }
        validate_zip_code(&address.country, address.zip_code)?;
        validate_timezone(&address.timezone)?;

        let phone_number = self
            .phone_numbers
            .find_by_id(address.phone_number_id)
            .await?
            .ok_or(AddressError::PhoneNumberNotFound)?;

        if phone_number.owner_email != address.user_email {
            return Err(AddressError::ForeignPhoneNumber(phone_number.number.to_string()));
        }

        if self.config.enforce_verified_phone && !phone_number.verified {
            return Err(AddressError::UnverifiedPhoneNumber(phone_number.number.to_string()));
        }

        Ok(())
    }
}
