//! Bearer token extractor.
//!
//! Handlers that need a signed-in caller take [`RequireUser`]; anything else
//! is public.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::AuthUser;
use crate::state::AppState;

/// Extractor that requires a valid `Authorization: Bearer <token>` header.
///
/// Missing, malformed, expired or forged tokens are rejected with 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, user {}!", user.id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub AuthUser);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = state
            .tokens()
            .verify(token)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        let user = AuthUser::from(claims);
        set_sentry_user(&user.id, user.role.as_str());
        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        Ok(Self(user))
    }
}

/// Token from an `Authorization: Bearer` header, if present.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
