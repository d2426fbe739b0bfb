//! Shared locations linked to users.

use sqlx::SqlitePool;
use tracing::info;
use userext_database::{AddressError, AddressResult, CreateLocationRequest, Location, LocationRepository};

use crate::utils::{normalize_email, validate_country, validate_length};

const MAX_ADDRESS_LENGTH: usize = 500;
const MAX_CITY_LENGTH: usize = 64;
const MAX_STATE_LENGTH: usize = 64;

pub struct LocationService {
    locations: LocationRepository,
}

impl LocationService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            locations: LocationRepository::new(pool),
        }
    }

    /// Find the location with the same address, city, state and country or create it
    pub async fn get_or_create(&self, request: CreateLocationRequest) -> AddressResult<Location> {
        validate_length("Address", &request.address, 1, MAX_ADDRESS_LENGTH)?;
        validate_length("City", &request.city, 1, MAX_CITY_LENGTH)?;
        if let Some(state) = request.state.as_deref() {
            validate_length("State", state, 1, MAX_STATE_LENGTH)?;
        }
        validate_country(&request.country)?;

        self.locations.get_or_create(&request).await
    }

    pub async fn find_by_id(&self, id: i64) -> AddressResult<Location> {
        self.locations
            .find_by_id(id)
            .await?
            .ok_or(AddressError::LocationNotFound)
    }

    pub async fn attach_to_user(&self, user_email: &str, location_id: i64) -> AddressResult<()> {
        let location = self.find_by_id(location_id).await?;
        let user_email = normalize_email(user_email);

        self.locations.attach(&user_email, location.id).await?;
        info!(user = %user_email, location = %location, "linked location");
        Ok(())
    }

    /// Returns `false` when the user was not linked to the location
    pub async fn detach_from_user(&self, user_email: &str, location_id: i64) -> AddressResult<bool> {
        self.locations
            .detach(&normalize_email(user_email), location_id)
            .await
    }

    pub async fn locations_of_user(&self, user_email: &str) -> AddressResult<Vec<Location>> {
        self.locations.locations_of_user(&normalize_email(user_email)).await
    }
}
