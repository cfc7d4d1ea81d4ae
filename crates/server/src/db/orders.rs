//! Order repository for database operations.
//!
//! Every status write is conditional on the status the caller observed, so
//! two requests racing on the same order can never both succeed.

use std::collections::HashMap;

use sqlx::PgPool;
use sqlx::types::Json;

use ipobre_core::{
    Money, OrderId, OrderStatus, OrderTotals, PaymentStatus, ProductId, Settlement, StoreId,
    UserId,
};

use super::RepositoryError;
use crate::models::{Address, Order, OrderDetail, OrderItem};

const ORDER_COLUMNS: &str = "id, customer_id, store_id, driver_id, status, delivery_address, \
     subtotal, delivery_fee, total, payment_method, payment_status, pix_txid, pix_code, \
     pix_qr_code, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, unit_price, notes";

/// A priced line ready to be inserted.
pub struct CreateOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
    pub notes: Option<String>,
}

/// Everything needed to insert an order and its lines.
pub struct CreateOrder<'a> {
    pub customer_id: UserId,
    pub store_id: StoreId,
    pub delivery_address: &'a Address,
    pub totals: OrderTotals,
    pub pix_txid: &'a str,
    pub items: Vec<CreateOrderItem>,
}

/// An order together with the owner of its store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderWithOwner {
    #[sqlx(flatten)]
    pub order: Order,
    pub store_owner_id: UserId,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its lines in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the transaction id collides or a
    /// product vanished, `RepositoryError::Database` for other failures.
    pub async fn create(&self, new: CreateOrder<'_>) -> Result<OrderDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            INSERT INTO orders (
                customer_id, store_id, delivery_address,
                subtotal, delivery_fee, total, pix_txid
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(new.customer_id)
        .bind(new.store_id)
        .bind(Json(new.delivery_address))
        .bind(new.totals.subtotal)
        .bind(new.totals.delivery_fee)
        .bind(new.totals.total)
        .bind(new.pix_txid)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "order could not be created"))?;

        let mut items = Vec::with_capacity(new.items.len());
        for item in new.items {
            let row = sqlx::query_as::<_, OrderItem>(&format!(
                r"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price, notes)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {ITEM_COLUMNS}
                "
            ))
            .bind(order.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "product no longer exists"))?;
            items.push(row);
        }

        tx.commit().await?;

        Ok(OrderDetail { order, items })
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Get an order and the owner of its store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_owner(
        &self,
        id: OrderId,
    ) -> Result<Option<OrderWithOwner>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderWithOwner>(&format!(
            r"
            SELECT {columns}, s.owner_id AS store_owner_id
            FROM orders o
            JOIN stores s ON s.id = o.store_id
            WHERE o.id = $1
            ",
            columns = qualified_order_columns()
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Find an order by its PIX transaction id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_txid(&self, txid: &str) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE pix_txid = $1"
        ))
        .bind(txid)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Whether an order with this ID exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        Ok(exists)
    }

    /// Lines of one order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id ASC"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Orders placed by a customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &self,
        customer: UserId,
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE customer_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(customer)
        .fetch_all(self.pool)
        .await?;

        self.with_items(orders).await
    }

    /// Orders of the given stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_stores(
        &self,
        stores: &[StoreId],
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE store_id = ANY($1)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(stores)
        .fetch_all(self.pool)
        .await?;

        self.with_items(orders).await
    }

    /// Unassigned orders in `status`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_unclaimed(
        &self,
        status: OrderStatus,
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE status = $1 AND driver_id IS NULL
            ORDER BY created_at ASC, id ASC
            "
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        self.with_items(orders).await
    }

    /// Orders assigned to a driver in any of `statuses`, most recently
    /// updated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_driver(
        &self,
        driver: UserId,
        statuses: &[OrderStatus],
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE driver_id = $1 AND status::TEXT = ANY($2)
            ORDER BY updated_at DESC, id DESC
            "
        ))
        .bind(driver)
        .bind(status_names(statuses))
        .fetch_all(self.pool)
        .await?;

        self.with_items(orders).await
    }

    /// Atomically assign `driver` to an unassigned order in `claimable`
    /// status and move it to `claimed`.
    ///
    /// Returns `None` when the order is missing, already assigned, or not in
    /// the claimable status. Exactly one of any set of concurrent callers
    /// gets `Some`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn claim(
        &self,
        id: OrderId,
        driver: UserId,
        claimable: OrderStatus,
        claimed: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders
            SET driver_id = $2, status = $4, updated_at = NOW()
            WHERE id = $1 AND status = $3 AND driver_id IS NULL
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(driver)
        .bind(claimable)
        .bind(claimed)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Move an order from `from` to `to`, only if it is still in `from`.
    ///
    /// Returns `None` when another request changed the status first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn compare_and_set_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Store the issued PIX charge and reset the payment to `pending`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order is gone or was paid
    /// in the meantime.
    pub async fn record_charge(
        &self,
        id: OrderId,
        pix_code: &str,
        pix_qr_code: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders
            SET pix_code = $2, pix_qr_code = $3, payment_status = 'pending', updated_at = NOW()
            WHERE id = $1 AND payment_status IN ('pending', 'failed')
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(pix_code)
        .bind(pix_qr_code)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Mark an unpaid order's charge as failed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_payment_failed(&self, id: OrderId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE orders
            SET payment_status = 'failed', updated_at = NOW()
            WHERE id = $1 AND payment_status = 'pending'
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Apply a provider settlement to the order with `txid`.
    ///
    /// The payment status changes only if it is currently one of
    /// `settlement.expected_payment`; the order status changes only if it is
    /// one of `order_from`. Returns `None` when nothing matched, which is how
    /// replayed notifications become no-ops.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn settle(
        &self,
        txid: &str,
        settlement: &Settlement,
        order_from: &[OrderStatus],
    ) -> Result<Option<Order>, RepositoryError> {
        let expected: Vec<&str> = settlement
            .expected_payment
            .iter()
            .map(PaymentStatus::as_str)
            .collect();

        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders
            SET payment_status = $3,
                status = CASE WHEN status::TEXT = ANY($5) THEN $4 ELSE status END,
                updated_at = NOW()
            WHERE pix_txid = $1 AND payment_status::TEXT = ANY($2)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(txid)
        .bind(expected)
        .bind(settlement.payment)
        .bind(settlement.order)
        .bind(status_names(order_from))
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Load the lines of `orders` with one query and pair them up.
    async fn with_items(&self, orders: Vec<Order>) -> Result<Vec<OrderDetail>, RepositoryError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let rows = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id ASC"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in rows {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderDetail { order, items }
            })
            .collect())
    }
}

fn status_names(statuses: &[OrderStatus]) -> Vec<&'static str> {
    statuses.iter().map(OrderStatus::as_str).collect()
}

fn qualified_order_columns() -> String {
    ORDER_COLUMNS
        .split(',')
        .map(|c| format!("o.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_order_columns() {
        let columns = qualified_order_columns();
        assert!(columns.starts_with("o.id, o.customer_id"));
        assert!(columns.ends_with("o.updated_at"));
        assert!(!columns.contains("  "));
    }

    #[test]
    fn test_status_names_match_database_labels() {
        assert_eq!(
            status_names(&[OrderStatus::Delivering, OrderStatus::PickedUp]),
            vec!["delivering", "picked_up"]
        );
    }
}
