//! Authentication service.
//!
//! Password accounts with Argon2id hashes and HS256 bearer tokens.

mod error;
pub mod jwt;

pub use error::AuthError;
pub use jwt::{Claims, TokenKeys};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use ipobre_core::{Email, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::users::{CreateUser, UserRepository};
use crate::models::{NewUser, ProfileUpdate, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// The caller behind a verified bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub role: UserRole,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

/// Authentication service.
///
/// Handles registration, login and profile management.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenKeys) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Register a new account and issue its first token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::InvalidProfile` if the name or address is incomplete.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, new: &NewUser) -> Result<(User, String), AuthError> {
        let email = Email::parse(&new.email)?;
        validate_password(&new.password)?;

        let name = new.name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidProfile("name is required".to_string()));
        }
        if let Some(field) = new.address.as_ref().and_then(|a| a.missing_field()) {
            return Err(AuthError::InvalidProfile(format!("address {field} is required")));
        }

        let password_hash = hash_password(&new.password)?;

        let user = self
            .users
            .create(CreateUser {
                name,
                email: &email,
                password_hash: &password_hash,
                phone: new.phone.as_deref(),
                address: new.address.as_ref(),
                role: new.role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        let token = self.tokens.issue(user.id, user.role)?;
        tracing::info!(user_id = %user.id, role = %user.role, "User registered");

        Ok((user, token))
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        // A malformed email cannot belong to any account.
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.tokens.issue(user.id, user.role)?;
        Ok((user, token))
    }

    /// Load the caller's profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn profile(&self, id: UserId) -> Result<User, AuthError> {
        self.users.get_by_id(id).await?.ok_or(AuthError::UserNotFound)
    }

    /// Update name, phone and address.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidProfile` for a blank name or incomplete address.
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, AuthError> {
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AuthError::InvalidProfile("name cannot be blank".to_string()));
        }
        if let Some(field) = update.address.as_ref().and_then(|a| a.missing_field()) {
            return Err(AuthError::InvalidProfile(format!("address {field} is required")));
        }

        self.users
            .update_profile(id, update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("1234567"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("feijoada-de-sabado").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("feijoada-de-sabado", &hash).is_ok());
        assert!(matches!(
            verify_password("feijoada-de-domingo", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_corrupt_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("whatever1", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
