//! Order and payment status enums.
//!
//! The marketplace tracks two independent markers on every order: where the
//! order is in its lifecycle ([`OrderStatus`]) and whether the PIX charge was
//! settled ([`PaymentStatus`]). Which lifecycle moves are legal lives in
//! [`crate::types::lifecycle`].

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// ```text
/// pending -> paid -> confirmed -> preparing -> ready -> delivering -> picked_up -> delivered
///    |        |          |
///    +--------+----------+--> cancelled
/// ```
///
/// `delivering` is entered only through a driver claim. `in_delivery` is
/// accepted on input as a legacy spelling of `delivering`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, waiting for the PIX payment.
    #[default]
    Pending,
    /// Payment settled, waiting for the store.
    Paid,
    /// Accepted by the store.
    Confirmed,
    /// Being prepared.
    Preparing,
    /// Ready for pickup by a driver.
    Ready,
    /// Claimed by a driver.
    #[serde(alias = "in_delivery")]
    Delivering,
    /// Driver has collected the order from the store.
    PickedUp,
    /// Handed to the customer.
    Delivered,
    /// Cancelled or refunded.
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 9] = [
        Self::Pending,
        Self::Paid,
        Self::Confirmed,
        Self::Preparing,
        Self::Ready,
        Self::Delivering,
        Self::PickedUp,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Delivering => "delivering",
            Self::PickedUp => "picked_up",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Statuses a driver is actively working on.
    #[must_use]
    pub const fn is_out_for_delivery(&self) -> bool {
        matches!(self, Self::Delivering | Self::PickedUp)
    }

    /// Statuses reachable from `self` in one step, by anyone.
    #[must_use]
    pub const fn allowed_next(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Paid, Self::Cancelled],
            Self::Paid => &[Self::Confirmed, Self::Delivering, Self::Cancelled],
            Self::Confirmed => &[Self::Preparing, Self::Cancelled],
            Self::Preparing => &[Self::Ready, Self::Cancelled],
            Self::Ready => &[Self::Delivering, Self::Cancelled],
            Self::Delivering => &[Self::PickedUp, Self::Delivered],
            Self::PickedUp => &[Self::Delivered],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    /// Whether the table allows `self -> next`.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        self.allowed_next().contains(&next)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_delivery" => Ok(Self::Delivering),
            other => Self::ALL
                .into_iter()
                .find(|status| status.as_str() == other)
                .ok_or_else(|| format!("invalid order status: {other}")),
        }
    }
}

/// Settlement status of the order's PIX charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Charge issued, not yet settled.
    #[default]
    Pending,
    /// Provider confirmed the transfer.
    Paid,
    /// The charge could not be issued.
    Failed,
    /// Provider returned the money to the payer.
    Refunded,
}

impl PaymentStatus {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_have_no_successors() {
        for status in OrderStatus::ALL {
            assert_eq!(status.is_terminal(), status.allowed_next().is_empty());
        }
    }

    #[test]
    fn test_cancellation_only_before_dispatch() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivering.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_out_for_delivery_statuses() {
        let active: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_out_for_delivery)
            .collect();
        assert_eq!(active, vec![OrderStatus::Delivering, OrderStatus::PickedUp]);
    }

    #[test]
    fn test_no_skipping_ahead() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Ready));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_legacy_in_delivery_spelling() {
        let parsed: OrderStatus = serde_json::from_str("\"in_delivery\"").unwrap();
        assert_eq!(parsed, OrderStatus::Delivering);
        assert_eq!("in_delivery".parse::<OrderStatus>().unwrap(), OrderStatus::Delivering);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"delivering\"");
    }

    #[test]
    fn test_parse_round_trips_every_status() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}
