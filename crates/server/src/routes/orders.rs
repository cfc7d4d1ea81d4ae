//! Order route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use ipobre_core::{OrderId, StoreId};

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{NewOrder, OrderDetail, StatusUpdate};
use crate::services::orders::OrderService;
use crate::state::AppState;

/// Optional store narrowing for store owners with several stores.
#[derive(Debug, Deserialize)]
pub struct StoreOrdersQuery {
    pub store_id: Option<StoreId>,
}

fn service(state: &AppState) -> OrderService<'_> {
    OrderService::new(state.pool(), state.gateway(), state.config().claim_policy)
}

/// Place an order and issue its PIX charge.
///
/// POST /api/orders
#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    let order = service(&state).place_order(&user, &body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/my-orders
pub async fn my_orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<OrderDetail>>> {
    Ok(Json(service(&state).list_customer_orders(&user).await?))
}

/// GET /api/orders/store-orders?store_id=
pub async fn store_orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<StoreOrdersQuery>,
) -> Result<Json<Vec<OrderDetail>>> {
    Ok(Json(
        service(&state)
            .list_store_orders(&user, query.store_id)
            .await?,
    ))
}

/// GET /api/orders/available-deliveries
pub async fn available_deliveries(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<OrderDetail>>> {
    Ok(Json(service(&state).list_available_deliveries(&user).await?))
}

/// GET /api/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(service(&state).get_order(&user, id).await?))
}

/// Claim a delivery.
///
/// POST /api/orders/{id}/accept-delivery
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn accept_delivery(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(service(&state).claim_delivery(&user, id).await?))
}

/// Move an order through its lifecycle.
///
/// PUT /api/orders/{id}/status
#[instrument(skip(state, body), fields(user_id = %user.id, status = %body.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(
        service(&state)
            .update_status(&user, id, body.status)
            .await?,
    ))
}
