//! PIX payment service.
//!
//! Issues charges through the configured [`PixGateway`] and applies provider
//! settlements. Settlements are conditional writes keyed on the transaction
//! id and the current payment status, so a notification delivered twice
//! changes the order once.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use ipobre_core::{
    OrderId, OrderRelation, OrderStatus, PaymentStatus, ProviderStatus, Settlement,
    authorize_transition,
};

use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::models::Order;
use crate::pix::webhook::SignatureError;
use crate::pix::{ChargeRequest, PixError, PixGateway};
use crate::services::auth::AuthUser;

/// Errors from payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// No order matches the id or transaction id.
    #[error("order not found")]
    NotFound,

    /// Caller does not own the order.
    #[error("only the customer who placed the order can do this")]
    Forbidden,

    /// The order is not in a state that accepts this operation.
    #[error("{0}")]
    Invalid(String),

    /// The order was settled while the charge was being issued.
    #[error("order was paid in the meantime")]
    AlreadyPaid,

    /// Webhook authentication failed.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The provider failed.
    #[error("payment provider error: {0}")]
    Gateway(#[from] PixError),

    /// Database operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Provider notification body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixNotification {
    pub tx_id: String,
    pub status: String,
}

/// Outcome of applying a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutcome {
    /// Whether the notification changed anything.
    pub processed: bool,
    /// Money was captured for an order that will never be delivered.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub refund_required: bool,
}

impl WebhookOutcome {
    const UNCHANGED: Self = Self {
        processed: false,
        refund_required: false,
    };

    fn settled(order: &Order) -> Self {
        Self {
            processed: true,
            refund_required: order.payment_status == PaymentStatus::Paid
                && order.status == OrderStatus::Cancelled,
        }
    }
}

/// Payment state of an order as seen by its customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusView {
    pub order_id: OrderId,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
}

/// A freshly issued charge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixChargeView {
    pub order_id: OrderId,
    pub tx_id: String,
    pub pix_code: Option<String>,
    pub qr_code: Option<String>,
    pub amount: ipobre_core::Money,
    pub payment_status: PaymentStatus,
}

impl From<Order> for PixChargeView {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            tx_id: order.pix_txid,
            pix_code: order.pix_code,
            qr_code: order.pix_qr_code,
            amount: order.total,
            payment_status: order.payment_status,
        }
    }
}

/// PIX payment service.
pub struct PaymentService<'a> {
    orders: OrderRepository<'a>,
    gateway: &'a PixGateway,
}

impl<'a> PaymentService<'a> {
    /// Create a new payment service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, gateway: &'a PixGateway) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            gateway,
        }
    }

    /// Request a PIX charge for `order` and store the code.
    ///
    /// On provider failure the payment is marked `failed` before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Gateway` when the provider fails and
    /// `PaymentError::AlreadyPaid` if a settlement landed first.
    pub async fn charge(&self, order: &Order) -> Result<Order, PaymentError> {
        let request = ChargeRequest {
            order_id: order.id,
            txid: &order.pix_txid,
            amount: order.total,
        };

        match self.gateway.create_charge(request).await {
            Ok(charge) => self
                .orders
                .record_charge(order.id, &charge.copy_paste, charge.qr_code_png.as_deref())
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => PaymentError::AlreadyPaid,
                    other => PaymentError::Repository(other),
                }),
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "PIX charge failed");
                self.orders.mark_payment_failed(order.id).await?;
                Err(PaymentError::Gateway(e))
            }
        }
    }

    /// Issue (or reissue) the charge for a pending order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotFound`, `Forbidden` for anyone but the
    /// customer, `AlreadyPaid` once settled, `Invalid` when the order is not
    /// awaiting payment, and the errors of [`Self::charge`].
    #[instrument(skip(self), fields(user_id = %user.id))]
    pub async fn create_pix(
        &self,
        user: &AuthUser,
        order_id: OrderId,
    ) -> Result<PixChargeView, PaymentError> {
        let order = self.owned_order(user, order_id).await?;

        if order.payment_status == PaymentStatus::Paid {
            return Err(PaymentError::AlreadyPaid);
        }
        if order.status != OrderStatus::Pending {
            return Err(PaymentError::Invalid(format!(
                "order is {} and no longer awaiting payment",
                order.status
            )));
        }

        let order = self.charge(&order).await?;
        Ok(order.into())
    }

    /// Current payment and order status.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotFound` or `PaymentError::Forbidden`.
    pub async fn check_status(
        &self,
        user: &AuthUser,
        order_id: OrderId,
    ) -> Result<PaymentStatusView, PaymentError> {
        let order = self.owned_order(user, order_id).await?;
        Ok(PaymentStatusView {
            order_id: order.id,
            payment_status: order.payment_status,
            order_status: order.status,
        })
    }

    /// Apply an authenticated provider notification.
    ///
    /// Unknown provider statuses are acknowledged without changes.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotFound` for an unknown transaction id.
    #[instrument(skip(self, notification), fields(txid = %notification.tx_id, status = %notification.status))]
    pub async fn handle_notification(
        &self,
        notification: &PixNotification,
    ) -> Result<WebhookOutcome, PaymentError> {
        if self.orders.get_by_txid(&notification.tx_id).await?.is_none() {
            return Err(PaymentError::NotFound);
        }

        let status = ProviderStatus::parse(&notification.status);
        self.settle(&notification.tx_id, &status).await
    }

    /// Settle a sandbox order as if the provider had reported completion.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotFound` when the gateway is not the sandbox
    /// or the order does not exist, and `Forbidden` for anyone but the
    /// customer.
    #[instrument(skip(self), fields(user_id = %user.id))]
    pub async fn mock_complete(
        &self,
        user: &AuthUser,
        order_id: OrderId,
    ) -> Result<WebhookOutcome, PaymentError> {
        if !self.gateway.is_sandbox() {
            return Err(PaymentError::NotFound);
        }

        let order = self.owned_order(user, order_id).await?;
        self.settle(&order.pix_txid, &ProviderStatus::Completed)
            .await
    }

    async fn settle(
        &self,
        txid: &str,
        status: &ProviderStatus,
    ) -> Result<WebhookOutcome, PaymentError> {
        let Some(settlement) = status.settlement() else {
            tracing::info!(%status, "Ignoring provider status");
            return Ok(WebhookOutcome::UNCHANGED);
        };

        let order_from = settleable_statuses(&settlement);
        let Some(order) = self.orders.settle(txid, &settlement, &order_from).await? else {
            tracing::info!(%status, "Settlement already applied");
            return Ok(WebhookOutcome::UNCHANGED);
        };

        let outcome = WebhookOutcome::settled(&order);
        if outcome.refund_required {
            tracing::error!(
                order_id = %order.id,
                total = %order.total,
                "Payment captured for a cancelled order, refund required"
            );
        } else if order.status != settlement.order {
            tracing::warn!(
                order_id = %order.id,
                order_status = %order.status,
                payment_status = %order.payment_status,
                "Payment settled but order status left unchanged"
            );
        } else {
            tracing::info!(
                order_id = %order.id,
                payment_status = %order.payment_status,
                order_status = %order.status,
                "Payment settled"
            );
        }

        Ok(outcome)
    }

    async fn owned_order(&self, user: &AuthUser, order_id: OrderId) -> Result<Order, PaymentError> {
        let order = self
            .orders
            .get_by_id(order_id)
            .await?
            .ok_or(PaymentError::NotFound)?;

        if order.customer_id != user.id {
            return Err(PaymentError::Forbidden);
        }
        Ok(order)
    }
}

/// Order statuses from which the payment provider may move an order to the
/// settlement's target status.
fn settleable_statuses(settlement: &Settlement) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|&from| {
            authorize_transition(OrderRelation::PaymentProvider, from, settlement.order).is_ok()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use sqlx::types::Json;

    use ipobre_core::{Money, PaymentMethod, StoreId, UserId};

    use super::*;
    use crate::models::Address;

    #[test]
    fn test_completion_only_moves_pending_orders() {
        let settlement = ProviderStatus::Completed.settlement().unwrap();
        assert_eq!(settleable_statuses(&settlement), vec![OrderStatus::Pending]);
    }

    #[test]
    fn test_refund_spares_orders_on_the_road() {
        let settlement = ProviderStatus::Refunded.settlement().unwrap();
        let from = settleable_statuses(&settlement);

        assert!(from.contains(&OrderStatus::Paid));
        assert!(from.contains(&OrderStatus::Ready));
        for status in [
            OrderStatus::Delivering,
            OrderStatus::PickedUp,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert!(!from.contains(&status), "{status} must not be cancelled by a refund");
        }
    }

    #[test]
    fn test_notification_body() {
        let n: PixNotification =
            serde_json::from_str(r#"{"txId":"abc123","status":"CONCLUIDA"}"#).unwrap();
        assert_eq!(n.tx_id, "abc123");
        assert_eq!(ProviderStatus::parse(&n.status), ProviderStatus::Completed);
    }

    fn settled_order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(9),
            customer_id: UserId::new(1),
            store_id: StoreId::new(1),
            driver_id: None,
            status,
            delivery_address: Json(Address {
                street: "Rua Augusta".to_string(),
                number: "1500".to_string(),
                complement: None,
                neighborhood: "Consolação".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                zip_code: "01304-001".to_string(),
            }),
            subtotal: Money::from_centavos(2000),
            delivery_fee: Money::from_centavos(500),
            total: Money::from_centavos(2500),
            payment_method: PaymentMethod::Pix,
            payment_status: PaymentStatus::Paid,
            pix_txid: "0123456789abcdef0123456789abcdef".to_string(),
            pix_code: None,
            pix_qr_code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_outcome_shape() {
        let json = serde_json::to_string(&WebhookOutcome::UNCHANGED).unwrap();
        assert_eq!(json, r#"{"processed":false}"#);

        let paid = settled_order(OrderStatus::Paid);
        let json = serde_json::to_string(&WebhookOutcome::settled(&paid)).unwrap();
        assert_eq!(json, r#"{"processed":true}"#);
    }

    #[test]
    fn test_payment_on_cancelled_order_needs_refund() {
        let outcome = WebhookOutcome::settled(&settled_order(OrderStatus::Cancelled));
        assert!(outcome.processed);
        assert!(outcome.refund_required);

        let json = serde_json::to_value(outcome).unwrap();
        assert_eq!(json, serde_json::json!({ "processed": true, "refundRequired": true }));
    }

    #[test]
    fn test_refund_of_cancelled_order_needs_no_refund() {
        let mut order = settled_order(OrderStatus::Cancelled);
        order.payment_status = PaymentStatus::Refunded;
        assert!(!WebhookOutcome::settled(&order).refund_required);
    }
}
