//! Store directory and product catalog.
//!
//! Anyone may browse. Only store accounts create stores, and only the owner
//! of a store changes it or its products.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use ipobre_core::{ProductId, StoreId, UserId, UserRole};

use crate::db::stores::StoreFilter;
use crate::db::{ProductRepository, RepositoryError, StoreRepository};
use crate::models::{NewProduct, NewStore, Product, ProductUpdate, Store, StoreUpdate};
use crate::services::auth::AuthUser;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Store does not exist (or is not the caller's, for store mutations).
    #[error("store not found")]
    StoreNotFound,

    /// Product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// Caller may not change this resource.
    #[error("{0}")]
    Forbidden(String),

    /// Request body is incomplete.
    #[error("{0}")]
    Invalid(String),

    /// Still referenced by orders.
    #[error("{0}")]
    Conflict(String),

    /// Database operation failed.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Repository(other),
        }
    }
}

/// Store and product service.
pub struct CatalogService<'a> {
    stores: StoreRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            stores: StoreRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// Open a new store owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Forbidden` for non-store accounts and `Invalid`
    /// for a blank name or category or an incomplete address.
    #[instrument(skip(self, new), fields(owner_id = %user.id))]
    pub async fn create_store(&self, user: &AuthUser, new: &NewStore) -> Result<Store, CatalogError> {
        if user.role != UserRole::Store {
            return Err(CatalogError::Forbidden(
                "only store accounts can create stores".to_string(),
            ));
        }
        require_text("name", &new.name)?;
        require_text("category", &new.category)?;
        if let Some(field) = new.address.as_ref().and_then(|a| a.missing_field()) {
            return Err(CatalogError::Invalid(format!("address {field} is required")));
        }

        let store = self.stores.create(user.id, new).await?;
        tracing::info!(store_id = %store.id, "Store created");
        Ok(store)
    }

    /// Stores matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list_stores(&self, filter: &StoreFilter) -> Result<Vec<Store>, CatalogError> {
        Ok(self.stores.list(filter).await?)
    }

    /// One store.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::StoreNotFound` if it does not exist.
    pub async fn get_store(&self, id: StoreId) -> Result<Store, CatalogError> {
        self.stores
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::StoreNotFound)
    }

    /// Update one of the caller's stores.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::StoreNotFound` when the store does not exist or
    /// belongs to someone else.
    pub async fn update_store(
        &self,
        user: &AuthUser,
        id: StoreId,
        update: &StoreUpdate,
    ) -> Result<Store, CatalogError> {
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }
        if let Some(field) = update.address.as_ref().and_then(|a| a.missing_field()) {
            return Err(CatalogError::Invalid(format!("address {field} is required")));
        }

        self.stores
            .update_owned(id, user.id, update)
            .await?
            .ok_or(CatalogError::StoreNotFound)
    }

    /// Delete one of the caller's stores.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::StoreNotFound` when the store does not exist or
    /// belongs to someone else, and `Conflict` when it has orders.
    #[instrument(skip(self), fields(owner_id = %user.id))]
    pub async fn delete_store(&self, user: &AuthUser, id: StoreId) -> Result<(), CatalogError> {
        if self.stores.delete_owned(id, user.id).await? {
            tracing::info!("Store deleted");
            Ok(())
        } else {
            Err(CatalogError::StoreNotFound)
        }
    }

    /// Add a product to one of the caller's stores.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::StoreNotFound` for an unknown store,
    /// `Forbidden` when the caller does not own it, and `Invalid` for a blank
    /// name.
    #[instrument(skip(self, new), fields(owner_id = %user.id, store_id = %new.store_id))]
    pub async fn create_product(
        &self,
        user: &AuthUser,
        new: &NewProduct,
    ) -> Result<Product, CatalogError> {
        let store = self.get_store(new.store_id).await?;
        require_owner(user, store.owner_id)?;
        require_text("name", &new.name)?;

        let product = self.products.create(new).await?;
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Products of a store, optionally narrowed to a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list_store_products(
        &self,
        store_id: StoreId,
        category: Option<&str>,
    ) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.list_by_store(store_id, category).await?)
    }

    /// Products whose name or description contains `query`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.products.search(query).await?)
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if it does not exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.products
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)
    }

    /// Update a product of one of the caller's stores.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` or `Forbidden`.
    pub async fn update_product(
        &self,
        user: &AuthUser,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, CatalogError> {
        self.owned_product(user, id).await?;
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }

        self.products
            .update(id, update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::ProductNotFound,
                other => other.into(),
            })
    }

    /// Delete a product of one of the caller's stores.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound`, `Forbidden`, or `Conflict`
    /// when past orders reference the product.
    #[instrument(skip(self), fields(user_id = %user.id))]
    pub async fn delete_product(&self, user: &AuthUser, id: ProductId) -> Result<(), CatalogError> {
        self.owned_product(user, id).await?;

        if self.products.delete(id).await? {
            tracing::info!("Product deleted");
            Ok(())
        } else {
            Err(CatalogError::ProductNotFound)
        }
    }

    async fn owned_product(&self, user: &AuthUser, id: ProductId) -> Result<Product, CatalogError> {
        let (product, owner) = self
            .products
            .get_with_owner(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)?;
        require_owner(user, owner)?;
        Ok(product)
    }
}

fn require_owner(user: &AuthUser, owner: UserId) -> Result<(), CatalogError> {
    if user.role == UserRole::Store && user.id == owner {
        Ok(())
    } else {
        Err(CatalogError::Forbidden(
            "you do not own this store".to_string(),
        ))
    }
}

fn require_text(field: &str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        Err(CatalogError::Invalid(format!("{field} is required")))
    } else {
        Ok(())
    }
}
