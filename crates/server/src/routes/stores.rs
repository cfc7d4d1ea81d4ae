//! Store directory route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use ipobre_core::StoreId;

use super::MessageResponse;
use crate::db::stores::StoreFilter;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{NewStore, Store, StoreUpdate};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Open a store owned by the caller.
///
/// POST /api/stores
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<NewStore>,
) -> Result<(StatusCode, Json<Store>)> {
    let store = CatalogService::new(state.pool())
        .create_store(&user, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(store)))
}

/// List stores, optionally by category or name.
///
/// GET /api/stores?category=&search=
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<StoreFilter>,
) -> Result<Json<Vec<Store>>> {
    Ok(Json(
        CatalogService::new(state.pool())
            .list_stores(&filter)
            .await?,
    ))
}

/// GET /api/stores/{id}
pub async fn show(State(state): State<AppState>, Path(id): Path<StoreId>) -> Result<Json<Store>> {
    Ok(Json(CatalogService::new(state.pool()).get_store(id).await?))
}

/// PUT /api/stores/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<StoreId>,
    Json(body): Json<StoreUpdate>,
) -> Result<Json<Store>> {
    Ok(Json(
        CatalogService::new(state.pool())
            .update_store(&user, id, &body)
            .await?,
    ))
}

/// DELETE /api/stores/{id}
pub async fn destroy(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<StoreId>,
) -> Result<Json<MessageResponse>> {
    CatalogService::new(state.pool())
        .delete_store(&user, id)
        .await?;
    Ok(Json(MessageResponse::new("Store deleted")))
}
