//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Service errors convert into
//! `AppError`, which picks the HTTP status, captures server-side failures to
//! Sentry and answers with a JSON `{ "message": ... }` body. Internal details
//! never reach the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use ipobre_core::TransitionError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;
use crate::services::orders::OrderError;
use crate::services::payments::PaymentError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Payment operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => auth_status(err),
            Self::Catalog(err) => catalog_status(err),
            Self::Order(err) => order_status(err),
            Self::Payment(err) => payment_status(err),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        let status = self.status();
        if status.is_server_error() {
            return if status == StatusCode::BAD_GATEWAY {
                "Payment provider unavailable".to_string()
            } else {
                "Internal server error".to_string()
            };
        }

        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::InvalidToken => "Invalid or expired token".to_string(),
                AuthError::UserNotFound => "User not found".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::WeakPassword(msg) | AuthError::InvalidProfile(msg) => msg.clone(),
                _ => "Authentication error".to_string(),
            },
            Self::Catalog(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Payment(err) => match err {
                PaymentError::Signature(_) => "Invalid webhook signature".to_string(),
                other => other.to_string(),
            },
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::BadRequest(msg) => msg.clone(),
            Self::Database(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

const fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) | AuthError::InvalidProfile(_) => {
            StatusCode::BAD_REQUEST
        }
        AuthError::TokenSigning(_) | AuthError::Repository(_) | AuthError::PasswordHash => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

const fn catalog_status(err: &CatalogError) -> StatusCode {
    match err {
        CatalogError::StoreNotFound | CatalogError::ProductNotFound => StatusCode::NOT_FOUND,
        CatalogError::Forbidden(_) => StatusCode::FORBIDDEN,
        CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
        CatalogError::Conflict(_) => StatusCode::CONFLICT,
        CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn order_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::NotFound | OrderError::StoreNotFound => StatusCode::NOT_FOUND,
        OrderError::StoreClosed | OrderError::Invalid(_) | OrderError::Totals(_) => {
            StatusCode::BAD_REQUEST
        }
        OrderError::Forbidden(_) => StatusCode::FORBIDDEN,
        OrderError::Conflict(_) => StatusCode::CONFLICT,
        OrderError::Transition(err) => transition_status(err),
        OrderError::Payment(err) => payment_status(err),
        OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn transition_status(err: &TransitionError) -> StatusCode {
    match err {
        TransitionError::Forbidden { .. } => StatusCode::FORBIDDEN,
        TransitionError::Terminal(_) => StatusCode::CONFLICT,
        TransitionError::NotAllowed { .. } | TransitionError::ClaimOnly => StatusCode::BAD_REQUEST,
    }
}

const fn payment_status(err: &PaymentError) -> StatusCode {
    match err {
        PaymentError::NotFound => StatusCode::NOT_FOUND,
        PaymentError::Forbidden => StatusCode::FORBIDDEN,
        PaymentError::Invalid(_) => StatusCode::BAD_REQUEST,
        PaymentError::AlreadyPaid => StatusCode::CONFLICT,
        PaymentError::Signature(_) => StatusCode::UNAUTHORIZED,
        PaymentError::Gateway(_) => StatusCode::BAD_GATEWAY,
        PaymentError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, role: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
        scope.set_tag("user_role", role);
    });
}
