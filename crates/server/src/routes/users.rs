//! Account route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{NewUser, ProfileUpdate, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token returned by register and login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Create an account.
///
/// POST /api/users/register
#[instrument(skip(state, body), fields(email = %body.email, role = %body.role))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let (_, token) = auth.register(&body).await?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// Exchange credentials for a token.
///
/// POST /api/users/login
#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let (user, token) = auth.login(&body.email, &body.password).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(TokenResponse { token }))
}

/// The caller's profile.
///
/// GET /api/users/profile
pub async fn profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<User>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    Ok(Json(auth.profile(user.id).await?))
}

/// Update name, phone and address.
///
/// PUT /api/users/profile
#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<User>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    Ok(Json(auth.update_profile(user.id, &body).await?))
}
