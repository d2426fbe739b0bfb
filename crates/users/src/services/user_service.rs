//! User service for managing user operations.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use std::net::IpAddr;
use tracing::{info, warn};
use userext_config::UsersConfig;
use userext_database::{
    CreateUserRequest, Gender, NewUser, UpdateProfileRequest, UpdateUserRequest, User, UserError,
    UserRepository, UserResult,
};

use crate::utils::{
    hash_password, normalize_email, validate_email, validate_language, validate_min_age,
    validate_person_name, validate_social_url, validate_user_name, verify_password,
};

const MAX_SEARCH_RESULTS: u32 = 100;

/// User totals for administrative listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
    pub inactive_users: i64,
}

/// Service for managing user operations
pub struct UserService<R = UserRepository> {
    user_repository: R,
    config: UsersConfig,
}

impl UserService<UserRepository> {
    /// Create a new user service instance with real database repository
    pub fn new(pool: SqlitePool, config: UsersConfig) -> Self {
        Self {
            user_repository: UserRepository::new(pool),
            config,
        }
    }
}

impl<R> UserService<R>
where
    R: UserRepo,
{
    /// Create a service over any repository implementation
    pub fn with_repository(user_repository: R, config: UsersConfig) -> Self {
        Self {
            user_repository,
            config,
        }
    }

    /// Create a regular user.
    ///
    /// The account starts inactive until its email is verified unless the
    /// request says otherwise.
    pub async fn create_user(&self, request: CreateUserRequest) -> UserResult<User> {
        let is_staff = request.is_staff.unwrap_or(false);
        let is_superuser = request.is_superuser.unwrap_or(false);
        let is_active = request.is_active.unwrap_or(false);

        self.insert_user(request, is_staff, is_superuser, is_active).await
    }

    /// Create a superuser; staff, superuser and active default to true and
    /// the first two cannot be turned off
    pub async fn create_superuser(&self, request: CreateUserRequest) -> UserResult<User> {
        let is_staff = request.is_staff.unwrap_or(true);
        let is_superuser = request.is_superuser.unwrap_or(true);
        let is_active = request.is_active.unwrap_or(true);

        if !is_staff {
            return Err(UserError::ValidationFailed(
                "Superuser must have is_staff=True.".to_string(),
            ));
        }
        if !is_superuser {
            return Err(UserError::ValidationFailed(
                "Superuser must have is_superuser=True.".to_string(),
            ));
        }

        self.insert_user(request, is_staff, is_superuser, is_active).await
    }

    async fn insert_user(
        &self,
        request: CreateUserRequest,
        is_staff: bool,
        is_superuser: bool,
        is_active: bool,
    ) -> UserResult<User> {
        if request.email.trim().is_empty() {
            return Err(UserError::EmailRequired);
        }

        let email = normalize_email(&request.email);
        validate_email(&email)?;

        let user_name = request.user_name.unwrap_or_default();
        let first_name = request.first_name.unwrap_or_default();
        let last_name = request.last_name.unwrap_or_default();
        let language = request.language.unwrap_or_else(|| "en".to_string());

        validate_user_name(&user_name)?;
        validate_person_name("First name", &first_name)?;
        validate_person_name("Last name", &last_name)?;
        validate_language(&language)?;
        if let Some(birth_date) = request.birth_date {
            self.validate_birth_date(birth_date)?;
        }

        if self.user_repository.email_exists(&email).await? {
            return Err(UserError::EmailAlreadyExists);
        }

        let password_hash = match request.password.as_deref() {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        let new_user = NewUser {
            email,
            password_hash,
            user_name,
            first_name,
            last_name,
            gender: request.gender.unwrap_or_default(),
            birth_date: request.birth_date,
            language,
            registration_ip: request.registration_ip,
            is_staff,
            is_superuser,
            is_active,
        };

        let user = self.user_repository.create(&new_user).await?;

        info!(email = %user.email, is_staff, is_superuser, "created user");

        Ok(user)
    }

    /// Get a user by email
    pub async fn get_user(&self, email: &str) -> UserResult<User> {
        self.find_by_email(email)
            .await?
            .ok_or(UserError::UserNotFound)
    }

    pub async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        self.user_repository.find_by_email(&normalize_email(email)).await
    }

    /// Users ordered by email
    pub async fn list_users(&self, limit: u32, offset: u32) -> UserResult<Vec<User>> {
        self.user_repository.list(limit, offset).await
    }

    /// Search users by email, first name or last name
    pub async fn search_users(&self, query: &str, limit: u32) -> UserResult<Vec<User>> {
        let trimmed_query = query.trim();
        if trimmed_query.is_empty() {
            return Ok(Vec::new());
        }

        self.user_repository
            .search(trimmed_query, limit.min(MAX_SEARCH_RESULTS))
            .await
    }

    /// Apply a profile form; names and birth date are mandatory
    pub async fn update_profile(&self, email: &str, request: UpdateProfileRequest) -> UserResult<User> {
        let mut user = self.get_user(email).await?;

        if request.first_name.trim().is_empty() {
            return Err(UserError::ValidationFailed("First name cannot be empty".to_string()));
        }
        if request.last_name.trim().is_empty() {
            return Err(UserError::ValidationFailed("Last name cannot be empty".to_string()));
        }
        let Some(birth_date) = request.birth_date else {
            return Err(UserError::ValidationFailed("Birth Date must be set".to_string()));
        };

        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();
        validate_person_name("First name", &first_name)?;
        validate_person_name("Last name", &last_name)?;
        self.validate_birth_date(birth_date)?;
        validate_language(&request.language)?;

        user.first_name = first_name;
        user.last_name = last_name;
        user.gender = request.gender;
        user.birth_date = Some(birth_date);
        user.language = request.language;

        let updated = self.user_repository.update(&user).await?;
        info!(email = %updated.email, "updated user profile");
        Ok(updated)
    }

    /// Partial update used by administrators
    pub async fn update_user(&self, email: &str, request: UpdateUserRequest) -> UserResult<User> {
        let mut user = self.get_user(email).await?;

        if let Some(ref user_name) = request.user_name {
            validate_user_name(user_name)?;
        }
        if let Some(ref first_name) = request.first_name {
            validate_person_name("First name", first_name)?;
        }
        if let Some(ref last_name) = request.last_name {
            validate_person_name("Last name", last_name)?;
        }
        if let Some(birth_date) = request.birth_date {
            self.validate_birth_date(birth_date)?;
        }
        if let Some(ref language) = request.language {
            validate_language(language)?;
        }
        for (label, url) in [
            ("LinkedIn", &request.linkedin),
            ("Facebook", &request.facebook),
            ("GitHub", &request.github),
            ("Twitter", &request.twitter),
        ] {
            if let Some(url) = url {
                validate_social_url(label, url)?;
            }
        }

        request.apply_to(&mut user);

        let updated = self.user_repository.update(&user).await?;
        info!(email = %updated.email, "updated user");
        Ok(updated)
    }

    /// Enable or disable an account without deleting it
    pub async fn set_active(&self, email: &str, is_active: bool) -> UserResult<()> {
        let email = normalize_email(email);
        self.user_repository.update_active_status(&email, is_active).await?;
        info!(email = %email, is_active, "changed user active status");
        Ok(())
    }

    /// Delete a user together with everything it owns
    pub async fn delete_user(&self, email: &str) -> UserResult<()> {
        let email = normalize_email(email);
        self.user_repository.delete(&email).await?;
        warn!(email = %email, "deleted user");
        Ok(())
    }

    /// Update user last login
    pub async fn record_login(&self, email: &str, ip: Option<IpAddr>) -> UserResult<()> {
        self.user_repository
            .update_last_login(&normalize_email(email), Utc::now(), ip)
            .await
    }

    /// Set or clear the password; `None` leaves the account without a usable password
    pub async fn set_password(&self, email: &str, password: Option<&str>) -> UserResult<()> {
        let password_hash = match password {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        self.user_repository
            .update_password(&normalize_email(email), password_hash.as_deref())
            .await
    }

    /// `false` for unknown passwords and accounts without a usable password
    pub async fn check_password(&self, email: &str, password: &str) -> UserResult<bool> {
        let user = self.get_user(email).await?;
        match user.password_hash.as_deref() {
            Some(hash) => verify_password(password, hash),
            None => Ok(false),
        }
    }

    /// Check if email is available
    pub async fn is_email_available(&self, email: &str) -> UserResult<bool> {
        let email = normalize_email(email);
        validate_email(&email)?;

        let exists = self.user_repository.email_exists(&email).await?;
        Ok(!exists)
    }

    pub async fn get_user_stats(&self) -> UserResult<UserStats> {
        let total_users = self.user_repository.count().await?;
        let active_users = self.user_repository.count_active().await?;

        Ok(UserStats {
            total_users,
            active_users,
            inactive_users: total_users - active_users,
        })
    }

    fn validate_birth_date(&self, birth_date: NaiveDate) -> UserResult<()> {
        validate_min_age(birth_date, self.config.min_age_years, Utc::now().date_naive())
    }
}

/// Trait for user repositories to allow generic usage
#[allow(async_fn_in_trait)]
pub trait UserRepo {
    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>>;
    async fn create(&self, new_user: &NewUser) -> UserResult<User>;
    async fn update(&self, user: &User) -> UserResult<User>;
    async fn delete(&self, email: &str) -> UserResult<()>;
    async fn update_active_status(&self, email: &str, is_active: bool) -> UserResult<()>;
    async fn update_password(&self, email: &str, password_hash: Option<&str>) -> UserResult<()>;
    async fn update_last_login(
        &self,
        email: &str,
        at: chrono::DateTime<Utc>,
        ip: Option<IpAddr>,
    ) -> UserResult<()>;
    async fn list(&self, limit: u32, offset: u32) -> UserResult<Vec<User>>;
    async fn search(&self, query: &str, limit: u32) -> UserResult<Vec<User>>;
    async fn email_exists(&self, email: &str) -> UserResult<bool>;
    async fn count(&self) -> UserResult<i64>;
    async fn count_active(&self) -> UserResult<i64>;
}

impl UserRepo for UserRepository {
    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        self.find_by_email(email).await
    }

    async fn create(&self, new_user: &NewUser) -> UserResult<User> {
        self.create(new_user).await
    }

    async fn update(&self, user: &User) -> UserResult<User> {
        self.update(user).await
    }

    async fn delete(&self, email: &str) -> UserResult<()> {
        self.delete(email).await
    }

    async fn update_active_status(&self, email: &str, is_active: bool) -> UserResult<()> {
        self.update_active_status(email, is_active).await
    }

    async fn update_password(&self, email: &str, password_hash: Option<&str>) -> UserResult<()> {
        self.update_password(email, password_hash).await
    }

    async fn update_last_login(
        &self,
        email: &str,
        at: chrono::DateTime<Utc>,
        ip: Option<IpAddr>,
    ) -> UserResult<()> {
        self.update_last_login(email, at, ip).await
    }

    async fn list(&self, limit: u32, offset: u32) -> UserResult<Vec<User>> {
        self.list(limit, offset).await
    }

    async fn search(&self, query: &str, limit: u32) -> UserResult<Vec<User>> {
        self.search(query, limit).await
    }

    async fn email_exists(&self, email: &str) -> UserResult<bool> {
        self.email_exists(email).await
    }

    async fn count(&self) -> UserResult<i64> {
        self.count().await
    }

    async fn count_active(&self) -> UserResult<i64> {
        self.count_active().await
    }
}
