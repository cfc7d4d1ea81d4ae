//! Product catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use ipobre_core::{ProductId, StoreId};

use super::MessageResponse;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{NewProduct, Product, ProductUpdate};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Category filter for a store's menu.
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

/// Free-text product search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Add a product to one of the caller's stores.
///
/// POST /api/products
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = CatalogService::new(state.pool())
        .create_product(&user, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/products/store/{store_id}?category=
pub async fn by_store(
    State(state): State<AppState>,
    Path(store_id): Path<StoreId>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(
        CatalogService::new(state.pool())
            .list_store_products(store_id, query.category.as_deref())
            .await?,
    ))
}

/// GET /api/products/search?q=
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(
        CatalogService::new(state.pool())
            .search_products(&query.q)
            .await?,
    ))
}

/// GET /api/products/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(CatalogService::new(state.pool()).get_product(id).await?))
}

/// PUT /api/products/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductUpdate>,
) -> Result<Json<Product>> {
    Ok(Json(
        CatalogService::new(state.pool())
            .update_product(&user, id, &body)
            .await?,
    ))
}

/// DELETE /api/products/{id}
pub async fn destroy(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<ProductId>,
) -> Result<Json<MessageResponse>> {
    CatalogService::new(state.pool())
        .delete_product(&user, id)
        .await?;
    Ok(Json(MessageResponse::new("Product deleted")))
}
