//! Driver claim policy.
//!
//! A driver claims an order by atomically setting itself as the order's driver
//! and moving it to `delivering`. Deployments disagree on when an order becomes
//! claimable: as soon as it is paid, or only once the kitchen marks it ready.
//! The choice is configuration, never a guess.

use serde::{Deserialize, Serialize};

use super::status::OrderStatus;

/// Unrecognised claim policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid driver claim status {0:?} (expected \"ready\" or \"paid\")")]
pub struct ClaimPolicyError(pub String);

/// Which order status a driver may claim from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClaimPolicy {
    /// Orders are claimable once the store marks them ready.
    #[default]
    Ready,
    /// Orders are claimable as soon as payment settles.
    Paid,
}

impl ClaimPolicy {
    /// The status an unassigned order must have to be claimed.
    #[must_use]
    pub const fn claimable_status(&self) -> OrderStatus {
        match self {
            Self::Ready => OrderStatus::Ready,
            Self::Paid => OrderStatus::Paid,
        }
    }

    /// Status written by a successful claim.
    #[must_use]
    pub const fn claimed_status(&self) -> OrderStatus {
        OrderStatus::Delivering
    }
}

impl std::str::FromStr for ClaimPolicy {
    type Err = ClaimPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ready" => Ok(Self::Ready),
            "paid" => Ok(Self::Paid),
            _ => Err(ClaimPolicyError(s.to_string())),
        }
    }
}
