//! Driver route handlers.
//!
//! Thin wrappers over the order service restricted to driver accounts.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use ipobre_core::OrderId;

use super::orders;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{OrderDetail, StatusUpdate};
use crate::services::orders::OrderService;
use crate::state::AppState;

fn service(state: &AppState) -> OrderService<'_> {
    OrderService::new(state.pool(), state.gateway(), state.config().claim_policy)
}

/// GET /api/drivers/available-orders
pub async fn available_orders(
    state: State<AppState>,
    user: RequireUser,
) -> Result<Json<Vec<OrderDetail>>> {
    orders::available_deliveries(state, user).await
}

/// POST /api/drivers/accept-order/{id}
pub async fn accept_order(
    state: State<AppState>,
    user: RequireUser,
    id: Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    orders::accept_delivery(state, user, id).await
}

/// PUT /api/drivers/update-order-status/{id}
#[instrument(skip(state, body), fields(user_id = %user.id, status = %body.status))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(
        service(&state)
            .driver_update_status(&user, id, body.status)
            .await?,
    ))
}

/// GET /api/drivers/my-orders
pub async fn my_orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<OrderDetail>>> {
    Ok(Json(service(&state).driver_active_orders(&user).await?))
}

/// GET /api/drivers/delivery-history
pub async fn delivery_history(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<OrderDetail>>> {
    Ok(Json(service(&state).driver_history(&user).await?))
}
