use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use log::*;

use crate::traits::{UserApiError, UserManagement};

/// Registration and login verification on top of a [`UserManagement`] store.
///
/// Passwords are hashed with argon2 before they reach the store; the store only ever sees the
/// PHC-format hash string.
pub struct AuthApi<B> {
    db: B,
}

impl<B> AuthApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AuthApi<B>
where B: UserManagement
{
    pub async fn register_user(&self, login: &str, password: &str) -> Result<(), UserApiError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| UserApiError::PasswordHash(e.to_string()))?
            .to_string();
        self.db.create_user(login, &hash).await?;
        debug!("🔑️ Registered new user {login}");
        Ok(())
    }

    /// Whether the login/password pair matches a stored user. An unknown login and a wrong
    /// password are deliberately indistinguishable.
    pub async fn verify_user(&self, login: &str, password: &str) -> Result<bool, UserApiError> {
        let Some(stored) = self.db.fetch_password_hash(login).await? else {
            return Ok(false);
        };
        let parsed = PasswordHash::new(&stored).map_err(|e| UserApiError::PasswordHash(e.to_string()))?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    }
}
