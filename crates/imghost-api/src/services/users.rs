//! Password accounts: the seeded administrator and password changes.
//!
//! Hashing and verification are CPU bound and run on the blocking pool.

use crate::auth::{hash_password, verify_password};
use imghost_core::models::{Principal, User};
use imghost_core::AppError;
use imghost_db::UserStore;
use std::sync::Arc;

const BAD_CREDENTIALS: &str = "Username or password incorrect";

async fn hash_blocking(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

async fn verify_blocking(password: &str, hash: &str) -> Result<bool, AppError> {
    let (password, hash) = (password.to_string(), hash.to_string());
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
}

pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Create the administrator account when it does not exist yet. An existing
    /// account keeps its current password. Returns whether an account was created.
    #[tracing::instrument(skip(self, password))]
    pub async fn ensure_default_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, AppError> {
        if self.users.find_by_username(username).await?.is_some() {
            tracing::debug!("Administrator account already exists");
            return Ok(false);
        }

        let hash = hash_blocking(password).await?;
        self.users.create(username, &hash).await?;
        tracing::info!("Administrator account created");
        Ok(true)
    }

    /// Password login. Unknown users and wrong passwords fail the same way.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::BadRequest("Invalid credentials".to_string()));
        }

        let Some(user) = self.users.find_by_username(username).await? else {
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };

        if !verify_blocking(password, &user.password_hash).await? {
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }
        Ok(user)
    }

    /// Replace the caller's password after checking the current one. Guests have
    /// no account and are refused.
    #[tracing::instrument(skip(self, old_password, new_password), fields(username = %principal.username))]
    pub async fn change_password(
        &self,
        principal: &Principal,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        if principal.is_guest() {
            return Err(AppError::Forbidden(
                "Guest sessions have no password".to_string(),
            ));
        }
        if old_password.is_empty() || new_password.is_empty() {
            return Err(AppError::BadRequest("Invalid payload".to_string()));
        }

        let user = self
            .users
            .find_by_username(&principal.username)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

        if !verify_blocking(old_password, &user.password_hash).await? {
            tracing::warn!("Password change rejected: old password incorrect");
            return Err(AppError::BadRequest("Old password incorrect".to_string()));
        }

        let hash = hash_blocking(new_password).await?;
        if !self.users.update_password(user.id, &hash).await? {
            return Err(AppError::Unauthorized("Unauthorized".to_string()));
        }

        tracing::info!("Password changed");
        Ok(())
    }
}
