//! HS256 access tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use ipobre_core::{UserId, UserRole};

use super::AuthError;
use crate::config::JwtConfig;

/// Claims carried by every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID, carried as a string as registered `sub` claims must be.
    #[serde(with = "subject")]
    pub sub: UserId,
    /// Role at the time the token was issued.
    pub role: UserRole,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiration (unix seconds).
    pub exp: i64,
}

mod subject {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use ipobre_core::UserId;

    pub fn serialize<S: Serializer>(id: &UserId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UserId, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<i32>().map(UserId::new).map_err(Error::custom)
    }
}

/// Signing and verification keys derived from `JWT_SECRET`.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("keys", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenKeys {
    /// Build keys from configuration.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::hours(config.ttl_hours),
        }
    }

    /// Issue a token for `user` with `role`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue(&self, user: UserId, role: UserRole) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::TokenSigning)
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for any malformed, forged or expired
    /// token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                AuthError::InvalidToken
            })
    }
}
