//! Who may move an order from one status to another.
//!
//! [`OrderStatus::allowed_next`] says which moves exist at all;
//! [`authorize_transition`] adds who is allowed to make each of them.

use serde::Serialize;

use super::status::OrderStatus;

/// How the acting party relates to a particular order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRelation {
    /// The customer who placed the order.
    Customer,
    /// The user who owns the order's store.
    StoreOwner,
    /// The driver currently assigned to the order.
    AssignedDriver,
    /// The payment provider, through the settlement bridge.
    PaymentProvider,
    /// Anyone else.
    Unrelated,
}

impl std::fmt::Display for OrderRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Customer => "customer",
            Self::StoreOwner => "store owner",
            Self::AssignedDriver => "assigned driver",
            Self::PaymentProvider => "payment provider",
            Self::Unrelated => "unrelated user",
        };
        f.write_str(name)
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The order already reached a terminal status.
    #[error("order is already {0}")]
    Terminal(OrderStatus),

    /// The transition table has no such edge.
    #[error("cannot move order from {from} to {to}")]
    NotAllowed {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// `delivering` is only entered by claiming the order.
    #[error("orders enter delivering only through a driver claim")]
    ClaimOnly,

    /// The edge exists but this party may not take it.
    #[error("{relation} may not move order to {to}")]
    Forbidden {
        /// Who tried.
        relation: OrderRelation,
        /// Requested status.
        to: OrderStatus,
    },
}

/// Check that `relation` may move an order from `from` to `to`.
///
/// # Errors
///
/// Returns `TransitionError::Terminal` for orders already delivered or
/// cancelled, `NotAllowed` when the table has no `from -> to` edge,
/// `ClaimOnly` for direct moves into `delivering`, and `Forbidden` when the
/// edge exists but belongs to a different party.
pub fn authorize_transition(
    relation: OrderRelation,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<(), TransitionError> {
    if from.is_terminal() {
        return Err(TransitionError::Terminal(from));
    }
    if !from.can_transition_to(to) {
        return Err(TransitionError::NotAllowed { from, to });
    }

    let permitted = match to {
        OrderStatus::Delivering => return Err(TransitionError::ClaimOnly),
        OrderStatus::Paid => relation == OrderRelation::PaymentProvider,
        OrderStatus::Confirmed | OrderStatus::Preparing | OrderStatus::Ready => {
            relation == OrderRelation::StoreOwner
        }
        OrderStatus::PickedUp | OrderStatus::Delivered => {
            relation == OrderRelation::AssignedDriver
        }
        OrderStatus::Cancelled => match relation {
            OrderRelation::StoreOwner | OrderRelation::PaymentProvider => true,
            OrderRelation::Customer => from == OrderStatus::Pending,
            OrderRelation::AssignedDriver | OrderRelation::Unrelated => false,
        },
        // Nothing transitions back into pending; the table already refused it.
        OrderStatus::Pending => false,
    };

    if permitted {
        Ok(())
    } else {
        Err(TransitionError::Forbidden { relation, to })
    }
}
