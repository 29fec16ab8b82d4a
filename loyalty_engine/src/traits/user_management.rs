use thiserror::Error;

/// User records and their stored password hashes.
///
/// The store never sees a plaintext password; hashing and verification happen in
/// [`crate::AuthApi`].
#[allow(async_fn_in_trait)]
pub trait UserManagement {
    /// Create a user. Logins are globally unique and case-sensitive; a collision fails with
    /// [`UserApiError::UserNotUnique`].
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<(), UserApiError>;

    /// The stored password hash for `login`, or `None` if no such user exists.
    async fn fetch_password_hash(&self, login: &str) -> Result<Option<String>, UserApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum UserApiError {
    #[error("User database error: {0}")]
    DatabaseError(String),
    #[error("The login {0} is already taken")]
    UserNotUnique(String),
    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl From<sqlx::Error> for UserApiError {
    fn from(e: sqlx::Error) -> Self {
        UserApiError::DatabaseError(e.to_string())
    }
}
