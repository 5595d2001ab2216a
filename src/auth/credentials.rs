//! Registration and credential checks

use crate::auth::models::{normalize_email, User, UserRecord, UserRole};
use crate::auth::password;
use crate::error::{Error, Result};
use crate::store::SharedStore;

const INVALID_CREDENTIALS: &str = "Invalid login credentials";

/// Persisted user accounts and their password hashes
#[derive(Clone)]
pub struct CredentialStore {
    store: SharedStore,
    bcrypt_cost: u32,
}

impl CredentialStore {
    pub fn new(store: SharedStore, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    /// Create an account. The role is checked before anything else so an
    /// unknown role never leaves a record behind.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<User> {
        let role: UserRole = role.parse()?;

        let username = username.trim();
        let email = normalize_email(email);
        if username.is_empty() {
            return Err(Error::Validation("username is required".to_string()));
        }
        if email.is_empty() {
            return Err(Error::Validation("email is required".to_string()));
        }
        if password.is_empty() {
            return Err(Error::Validation("password is required".to_string()));
        }

        let password_hash = password::hash_password(password, self.bcrypt_cost).await?;
        let record = UserRecord {
            user: User::new(username.to_string(), email, role),
            password_hash,
        };

        let user = self.store.insert_user(record).await?;
        tracing::info!("Registered user {} with role {}", user.id, user.role);
        Ok(user)
    }

    /// Check a plaintext password against the stored hash
    pub async fn verify_password(&self, record: &UserRecord, password: &str) -> bool {
        password::verify_password(password, &record.password_hash).await
    }

    /// Resolve login credentials to a user. Unknown email and wrong password
    /// produce the same error.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let Some(record) = self.store.get_user_by_email(&email).await? else {
            tracing::debug!("Login rejected: unknown email");
            return Err(Error::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !self.verify_password(&record, password).await {
            tracing::debug!("Login rejected for user {}: wrong password", record.user.id);
            return Err(Error::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        Ok(record.user)
    }
}
