//! Product repository for database operations.

use sqlx::PgPool;

use ipobre_core::{ProductId, StoreId, UserId};

use super::RepositoryError;
use super::stores::escape_like;
use crate::models::{NewProduct, Product, ProductUpdate};

const PRODUCT_COLUMNS: &str = "id, store_id, name, description, price, image, category, \
     ingredients, available, preparation_time, promotional_price, created_at";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Get a product together with the owner of its store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_owner(
        &self,
        id: ProductId,
    ) -> Result<Option<(Product, UserId)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            product: Product,
            owner_id: UserId,
        }

        let row = sqlx::query_as::<_, Row>(
            r"
            SELECT p.id, p.store_id, p.name, p.description, p.price, p.image, p.category,
                   p.ingredients, p.available, p.preparation_time, p.promotional_price,
                   p.created_at, s.owner_id
            FROM products p
            JOIN stores s ON s.id = p.store_id
            WHERE p.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.product, r.owner_id)))
    }

    /// Products of one store, optionally narrowed to a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_store(
        &self,
        store_id: StoreId,
        category: Option<&str>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE store_id = $1 AND ($2::TEXT IS NULL OR category = $2)
            ORDER BY name ASC, id ASC
            "
        ))
        .bind(store_id)
        .bind(category)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Products of one store by ID, for pricing an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_in_store(
        &self,
        store_id: StoreId,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE store_id = $1 AND id = ANY($2)"
        ))
        .bind(store_id)
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Case-insensitive search over name and description.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, RepositoryError> {
        let pattern = format!("%{}%", escape_like(query.trim()));
        let products = sqlx::query_as::<_, Product>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE name ILIKE $1 OR description ILIKE $1
            ORDER BY name ASC, id ASC
            LIMIT 100
            "
        ))
        .bind(pattern)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO products (
                store_id, name, description, price, image, category,
                ingredients, available, preparation_time, promotional_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(new.store_id)
        .bind(&new.name)
        .bind(new.description.as_deref())
        .bind(new.price)
        .bind(new.image.as_deref())
        .bind(new.category.as_deref())
        .bind(&new.ingredients)
        .bind(new.available)
        .bind(new.preparation_time)
        .bind(new.promotional_price)
        .fetch_one(self.pool)
        .await?;

        Ok(product)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE products
            SET name = COALESCE($2, name),
                price = COALESCE($3, price),
                description = COALESCE($4, description),
                image = COALESCE($5, image),
                category = COALESCE($6, category),
                ingredients = COALESCE($7, ingredients),
                available = COALESCE($8, available),
                preparation_time = COALESCE($9, preparation_time),
                promotional_price = COALESCE($10, promotional_price)
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.price)
        .bind(update.description.as_deref())
        .bind(update.image.as_deref())
        .bind(update.category.as_deref())
        .bind(update.ingredients.as_deref())
        .bind(update.available)
        .bind(update.preparation_time)
        .bind(update.promotional_price)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if order items reference it.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_constraint(e, "product is referenced by orders")
            })?;

        Ok(result.rows_affected() > 0)
    }
}
