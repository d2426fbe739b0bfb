//! In-memory repository used to test service logic without a database

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use userext_database::{NewUser, User, UserError, UserResult};

use super::user_service::UserRepo;

/// Users keyed by email, iterated in email order like the real table
#[derive(Clone, Default)]
pub struct MockUserRepository {
    users: Arc<RwLock<BTreeMap<String, User>>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn modify<F>(&self, email: &str, change: F) -> UserResult<()>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.write().await;
        let user = users.get_mut(email).ok_or(UserError::UserNotFound)?;
        change(user);
        user.last_update_date = Utc::now();
        Ok(())
    }
}

impl UserRepo for MockUserRepository {
    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn create(&self, new_user: &NewUser) -> UserResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&new_user.email) {
            return Err(UserError::EmailAlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            user_name: new_user.user_name.clone(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            gender: new_user.gender,
            birth_date: new_user.birth_date,
            linkedin: String::new(),
            facebook: String::new(),
            github: String::new(),
            twitter: String::new(),
            registration_ip: new_user.registration_ip,
            language: new_user.language.clone(),
            is_staff: new_user.is_staff,
            is_superuser: new_user.is_superuser,
            is_active: new_user.is_active,
            date_created: now,
            last_update_date: now,
            last_login: None,
            last_login_ip: None,
        };

        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> UserResult<User> {
        let mut users = self.users.write().await;
        let stored = users.get_mut(&user.email).ok_or(UserError::UserNotFound)?;
        *stored = User {
            last_update_date: Utc::now(),
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, email: &str) -> UserResult<()> {
        self.users
            .write()
            .await
            .remove(email)
            .map(|_| ())
            .ok_or(UserError::UserNotFound)
    }

    async fn update_active_status(&self, email: &str, is_active: bool) -> UserResult<()> {
        self.modify(email, |user| user.is_active = is_active).await
    }

    async fn update_password(&self, email: &str, password_hash: Option<&str>) -> UserResult<()> {
        let password_hash = password_hash.map(str::to_string);
        self.modify(email, |user| user.password_hash = password_hash).await
    }

    async fn update_last_login(&self, email: &str, at: DateTime<Utc>, ip: Option<IpAddr>) -> UserResult<()> {
        self.modify(email, |user| {
            user.last_login = Some(at);
            user.last_login_ip = ip;
        })
        .await
    }

    async fn list(&self, limit: u32, offset: u32) -> UserResult<Vec<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn search(&self, query: &str, limit: u32) -> UserResult<Vec<User>> {
        let query = query.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|user| {
                user.email.to_lowercase().contains(&query)
                    || user.first_name.to_lowercase().contains(&query)
                    || user.last_name.to_lowercase().contains(&query)
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn email_exists(&self, email: &str) -> UserResult<bool> {
        Ok(self.users.read().await.contains_key(email))
    }

    async fn count(&self) -> UserResult<i64> {
        Ok(self.users.read().await.len() as i64)
    }

    async fn count_active(&self) -> UserResult<i64> {
        Ok(self.users.read().await.values().filter(|user| user.is_active).count() as i64)
    }
}
