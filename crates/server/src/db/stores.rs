//! Store repository for database operations.

use sqlx::PgPool;
use sqlx::types::Json;

use ipobre_core::{StoreId, UserId};

use super::RepositoryError;
use crate::models::{NewStore, Store, StoreUpdate};

const STORE_COLUMNS: &str = "id, owner_id, name, description, logo, cover_image, category, \
     address, opening_hours, is_open, rating, delivery_fee, minimum_order, created_at";

/// Directory filters for `GET /api/stores`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct StoreFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring of the store name.
    pub search: Option<String>,
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a store by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(store)
    }

    /// List stores matching the filter, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &StoreFilter) -> Result<Vec<Store>, RepositoryError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let stores = sqlx::query_as::<_, Store>(&format!(
            r"
            SELECT {STORE_COLUMNS}
            FROM stores
            WHERE ($1::TEXT IS NULL OR category = $1)
              AND ($2::TEXT IS NULL OR name ILIKE $2)
            ORDER BY name ASC, id ASC
            "
        ))
        .bind(filter.category.as_deref())
        .bind(search)
        .fetch_all(self.pool)
        .await?;

        Ok(stores)
    }

    /// IDs of every store `owner` owns, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ids_owned_by(&self, owner: UserId) -> Result<Vec<StoreId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, StoreId>(
            "SELECT id FROM stores WHERE owner_id = $1 ORDER BY id ASC",
        )
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Insert a store owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, owner: UserId, new: &NewStore) -> Result<Store, RepositoryError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            r"
            INSERT INTO stores (
                owner_id, name, description, logo, cover_image, category,
                address, opening_hours, is_open, delivery_fee, minimum_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {STORE_COLUMNS}
            "
        ))
        .bind(owner)
        .bind(&new.name)
        .bind(new.description.as_deref())
        .bind(new.logo.as_deref())
        .bind(new.cover_image.as_deref())
        .bind(&new.category)
        .bind(new.address.as_ref().map(Json))
        .bind(new.opening_hours.as_ref().map(Json))
        .bind(new.is_open)
        .bind(new.delivery_fee)
        .bind(new.minimum_order)
        .fetch_one(self.pool)
        .await?;

        Ok(store)
    }

    /// Update a store if `owner` owns it.
    ///
    /// Returns `None` when the store does not exist or belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_owned(
        &self,
        id: StoreId,
        owner: UserId,
        update: &StoreUpdate,
    ) -> Result<Option<Store>, RepositoryError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            r"
            UPDATE stores
            SET name = COALESCE($3, name),
                category = COALESCE($4, category),
                description = COALESCE($5, description),
                logo = COALESCE($6, logo),
                cover_image = COALESCE($7, cover_image),
                address = COALESCE($8, address),
                opening_hours = COALESCE($9, opening_hours),
                is_open = COALESCE($10, is_open),
                delivery_fee = COALESCE($11, delivery_fee),
                minimum_order = COALESCE($12, minimum_order)
            WHERE id = $1 AND owner_id = $2
            RETURNING {STORE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(owner)
        .bind(update.name.as_deref())
        .bind(update.category.as_deref())
        .bind(update.description.as_deref())
        .bind(update.logo.as_deref())
        .bind(update.cover_image.as_deref())
        .bind(update.address.as_ref().map(Json))
        .bind(update.opening_hours.as_ref().map(Json))
        .bind(update.is_open)
        .bind(update.delivery_fee)
        .bind(update.minimum_order)
        .fetch_optional(self.pool)
        .await?;

        Ok(store)
    }

    /// Delete a store if `owner` owns it. Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if orders still reference the store.
    pub async fn delete_owned(&self, id: StoreId, owner: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM stores WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "store has orders"))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Escape `LIKE` metacharacters in user input.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("pizza"), "pizza");
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
    }
}
