//! Order lifecycle service.
//!
//! Placement, visibility, the driver claim and status changes. Every status
//! write goes through [`authorize_transition`] first and then a conditional
//! update, so the table is enforced even under concurrent requests.

use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use ipobre_core::{
    ClaimPolicy, LineItem, OrderId, OrderRelation, OrderStatus, OrderTotals, StoreId,
    TotalsError, TransitionError, UserId, UserRole, authorize_transition,
};

use crate::db::RepositoryError;
use crate::db::orders::{CreateOrder, CreateOrderItem, OrderRepository};
use crate::db::{ProductRepository, StoreRepository};
use crate::models::{NewOrder, Order, OrderDetail, Product};
use crate::pix::{PixGateway, new_txid};
use crate::services::auth::AuthUser;
use crate::services::payments::{PaymentError, PaymentService};

/// Statuses a driver may set through the driver routes.
const DRIVER_SETTABLE: [OrderStatus; 2] = [OrderStatus::PickedUp, OrderStatus::Delivered];

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order does not exist.
    #[error("order not found")]
    NotFound,

    /// Store does not exist.
    #[error("store not found")]
    StoreNotFound,

    /// Store is not accepting orders.
    #[error("store is closed")]
    StoreClosed,

    /// Request is malformed or references unusable products.
    #[error("{0}")]
    Invalid(String),

    /// Totals could not be computed or are below the store minimum.
    #[error(transparent)]
    Totals(#[from] TotalsError),

    /// Caller may not see or touch this order.
    #[error("{0}")]
    Forbidden(String),

    /// The order changed under us or cannot be claimed.
    #[error("{0}")]
    Conflict(String),

    /// Transition table refused the status change.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The PIX charge could not be issued or recorded.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Database operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Order lifecycle service.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
    stores: StoreRepository<'a>,
    products: ProductRepository<'a>,
    payments: PaymentService<'a>,
    claim_policy: ClaimPolicy,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, gateway: &'a PixGateway, claim_policy: ClaimPolicy) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            stores: StoreRepository::new(pool),
            products: ProductRepository::new(pool),
            payments: PaymentService::new(pool, gateway),
            claim_policy,
        }
    }

    /// Place an order and request its PIX charge.
    ///
    /// Prices come from the catalog, never from the request. The order is
    /// committed before the provider is called; if the provider fails the
    /// order stays with payment `failed` and can be retried through the
    /// payments routes.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::StoreNotFound` (404), `StoreClosed`, `Invalid` or
    /// `Totals` (400), `Forbidden` for non-customers, and `Payment` when the
    /// provider cannot issue the charge.
    #[instrument(skip(self, new), fields(customer_id = %user.id, store_id = %new.store_id))]
    pub async fn place_order(
        &self,
        user: &AuthUser,
        new: &NewOrder,
    ) -> Result<OrderDetail, OrderError> {
        if user.role != UserRole::Customer {
            return Err(OrderError::Forbidden(
                "only customers can place orders".to_string(),
            ));
        }
        if let Some(field) = new.delivery_address.missing_field() {
            return Err(OrderError::Invalid(format!(
                "delivery address {field} is required"
            )));
        }

        let store = self
            .stores
            .get_by_id(new.store_id)
            .await?
            .ok_or(OrderError::StoreNotFound)?;
        if !store.is_open {
            return Err(OrderError::StoreClosed);
        }

        let ids: Vec<_> = new.items.iter().map(|item| item.product_id).collect();
        let catalog: HashMap<_, Product> = self
            .products
            .list_in_store(store.id, &ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut lines = Vec::with_capacity(new.items.len());
        let mut rows = Vec::with_capacity(new.items.len());
        for item in &new.items {
            let product = catalog.get(&item.product_id).ok_or_else(|| {
                OrderError::Invalid(format!(
                    "product {} is not sold by this store",
                    item.product_id
                ))
            })?;
            if !product.available {
                return Err(OrderError::Invalid(format!(
                    "product {} is unavailable",
                    product.name
                )));
            }

            let unit_price = product.effective_price();
            lines.push(LineItem {
                unit_price,
                quantity: item.quantity,
            });
            rows.push(CreateOrderItem {
                product_id: product.id,
                quantity: i32::try_from(item.quantity)
                    .map_err(|_| OrderError::Invalid("quantity is too large".to_string()))?,
                unit_price,
                notes: item.notes.clone(),
            });
        }

        let totals = OrderTotals::compute(&lines, store.delivery_fee)?;
        if let Some(minimum) = store.minimum_order {
            totals.ensure_minimum(minimum)?;
        }

        let txid = new_txid();
        let mut detail = self
            .orders
            .create(CreateOrder {
                customer_id: user.id,
                store_id: store.id,
                delivery_address: &new.delivery_address,
                totals,
                pix_txid: &txid,
                items: rows,
            })
            .await?;
        tracing::info!(order_id = %detail.order.id, total = %totals.total, "Order placed");

        detail.order = self.payments.charge(&detail.order).await?;
        Ok(detail)
    }

    /// Load an order visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist and
    /// `OrderError::Forbidden` if the caller is not a participant.
    pub async fn get_order(&self, user: &AuthUser, id: OrderId) -> Result<OrderDetail, OrderError> {
        let row = self
            .orders
            .get_with_owner(id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if relation_to(user, &row.order, row.store_owner_id) == OrderRelation::Unrelated {
            return Err(OrderError::Forbidden(
                "you are not a participant in this order".to_string(),
            ));
        }

        let items = self.orders.items(id).await?;
        Ok(OrderDetail {
            order: row.order,
            items,
        })
    }

    /// Orders the caller placed, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_customer_orders(
        &self,
        user: &AuthUser,
    ) -> Result<Vec<OrderDetail>, OrderError> {
        Ok(self.orders.list_for_customer(user.id).await?)
    }

    /// Orders of the caller's stores, optionally narrowed to one store.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` if the caller owns no store or does not
    /// own `store_id`.
    pub async fn list_store_orders(
        &self,
        user: &AuthUser,
        store_id: Option<StoreId>,
    ) -> Result<Vec<OrderDetail>, OrderError> {
        let owned = self.stores.ids_owned_by(user.id).await?;
        if owned.is_empty() {
            return Err(OrderError::Forbidden("you do not own a store".to_string()));
        }

        let scope = match store_id {
            Some(id) if owned.contains(&id) => vec![id],
            Some(_) => {
                return Err(OrderError::Forbidden(
                    "you do not own this store".to_string(),
                ));
            }
            None => owned,
        };

        Ok(self.orders.list_for_stores(&scope).await?)
    }

    /// Unassigned orders a driver can claim, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for non-drivers.
    pub async fn list_available_deliveries(
        &self,
        user: &AuthUser,
    ) -> Result<Vec<OrderDetail>, OrderError> {
        require_driver(user)?;
        Ok(self
            .orders
            .list_unclaimed(self.claim_policy.claimable_status())
            .await?)
    }

    /// Claim an order for delivery.
    ///
    /// One conditional update decides the race: of any number of concurrent
    /// claimants exactly one gets the order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for non-drivers, `NotFound` for unknown
    /// orders and `Conflict` when the order is taken or not claimable.
    #[instrument(skip(self), fields(driver_id = %user.id))]
    pub async fn claim_delivery(
        &self,
        user: &AuthUser,
        id: OrderId,
    ) -> Result<OrderDetail, OrderError> {
        require_driver(user)?;

        let claimed = self
            .orders
            .claim(
                id,
                user.id,
                self.claim_policy.claimable_status(),
                self.claim_policy.claimed_status(),
            )
            .await?;

        let Some(order) = claimed else {
            return if self.orders.exists(id).await? {
                Err(OrderError::Conflict(
                    "order is already claimed or not ready for delivery".to_string(),
                ))
            } else {
                Err(OrderError::NotFound)
            };
        };

        tracing::info!(order_id = %order.id, "Delivery claimed");
        let items = self.orders.items(order.id).await?;
        Ok(OrderDetail { order, items })
    }

    /// Move an order to `to` on behalf of the caller.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for unknown orders, `Forbidden` for
    /// callers unrelated to the order, `Transition` when the table refuses the
    /// move, and `Conflict` when another request changed the status first.
    #[instrument(skip(self), fields(user_id = %user.id))]
    pub async fn update_status(
        &self,
        user: &AuthUser,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<OrderDetail, OrderError> {
        let row = self
            .orders
            .get_with_owner(id)
            .await?
            .ok_or(OrderError::NotFound)?;

        let relation = relation_to(user, &row.order, row.store_owner_id);
        if relation == OrderRelation::Unrelated {
            return Err(OrderError::Forbidden(
                "you are not a participant in this order".to_string(),
            ));
        }

        let from = row.order.status;
        authorize_transition(relation, from, to)?;

        let order = self
            .orders
            .compare_and_set_status(id, from, to)
            .await?
            .ok_or_else(|| OrderError::Conflict("order status changed concurrently".to_string()))?;

        tracing::info!(order_id = %id, %from, %to, %relation, "Order status updated");
        let items = self.orders.items(id).await?;
        Ok(OrderDetail { order, items })
    }

    /// Status change through the driver routes: only `picked_up` and
    /// `delivered` are accepted.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for non-drivers and `Invalid` for any
    /// other target status, then the errors of [`Self::update_status`].
    pub async fn driver_update_status(
        &self,
        user: &AuthUser,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<OrderDetail, OrderError> {
        require_driver(user)?;
        if !DRIVER_SETTABLE.contains(&to) {
            return Err(OrderError::Invalid(format!(
                "drivers can only set picked_up or delivered, not {to}"
            )));
        }
        self.update_status(user, id, to).await
    }

    /// Deliveries the driver is currently carrying.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for non-drivers.
    pub async fn driver_active_orders(
        &self,
        user: &AuthUser,
    ) -> Result<Vec<OrderDetail>, OrderError> {
        require_driver(user)?;
        let active: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_out_for_delivery)
            .collect();
        Ok(self.orders.list_for_driver(user.id, &active).await?)
    }

    /// Deliveries the driver has completed, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for non-drivers.
    pub async fn driver_history(&self, user: &AuthUser) -> Result<Vec<OrderDetail>, OrderError> {
        require_driver(user)?;
        Ok(self
            .orders
            .list_for_driver(user.id, &[OrderStatus::Delivered])
            .await?)
    }
}

/// How `user` relates to `order`, whose store is owned by `store_owner`.
///
/// Role tags must agree with the relation: a store account that happens to
/// match `customer_id` is still not the customer.
#[must_use]
pub fn relation_to(user: &AuthUser, order: &Order, store_owner: UserId) -> OrderRelation {
    match user.role {
        UserRole::Customer if order.customer_id == user.id => OrderRelation::Customer,
        UserRole::Store if store_owner == user.id => OrderRelation::StoreOwner,
        UserRole::Driver if order.driver_id == Some(user.id) => OrderRelation::AssignedDriver,
        _ => OrderRelation::Unrelated,
    }
}

fn require_driver(user: &AuthUser) -> Result<(), OrderError> {
    if user.role == UserRole::Driver {
        Ok(())
    } else {
        Err(OrderError::Forbidden("only drivers can do this".to_string()))
    }
}
