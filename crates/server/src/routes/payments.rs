//! Payment route handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use chrono::Utc;
use tracing::instrument;

use ipobre_core::OrderId;

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::pix::webhook::{self, SIGNATURE_HEADER, SignatureError, TIMESTAMP_HEADER};
use crate::services::payments::{
    PaymentError, PaymentService, PaymentStatusView, PixChargeView, PixNotification,
    WebhookOutcome,
};
use crate::state::AppState;

fn service(state: &AppState) -> PaymentService<'_> {
    PaymentService::new(state.pool(), state.gateway())
}

/// (Re)issue the PIX charge of a pending order.
///
/// POST /api/payments/create-pix/{order_id}
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn create_pix(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(order_id): Path<OrderId>,
) -> Result<Json<PixChargeView>> {
    Ok(Json(service(&state).create_pix(&user, order_id).await?))
}

/// Provider notification.
///
/// POST /api/payments/pix-webhook
///
/// Authenticated by the `x-pix-timestamp` / `x-pix-signature` pair over the
/// raw body, not by bearer token.
#[instrument(skip_all)]
pub async fn pix_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookOutcome>> {
    let timestamp = header(&headers, TIMESTAMP_HEADER)?;
    let signature = header(&headers, SIGNATURE_HEADER)?;

    webhook::verify_signature(
        &state.config().pix.webhook_secret,
        timestamp,
        &body,
        signature,
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Rejected PIX webhook");
        PaymentError::Signature(e)
    })?;

    let notification: PixNotification = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid notification body: {e}")))?;

    Ok(Json(service(&state).handle_notification(&notification).await?))
}

/// GET /api/payments/check-status/{order_id}
pub async fn check_status(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(order_id): Path<OrderId>,
) -> Result<Json<PaymentStatusView>> {
    Ok(Json(service(&state).check_status(&user, order_id).await?))
}

/// Settle a sandbox charge without a provider.
///
/// POST /api/payments/mock-complete-payment/{order_id}
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn mock_complete_payment(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(order_id): Path<OrderId>,
) -> Result<Json<WebhookOutcome>> {
    Ok(Json(service(&state).mock_complete(&user, order_id).await?))
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PaymentError::Signature(SignatureError::MissingHeader(name)).into())
}
