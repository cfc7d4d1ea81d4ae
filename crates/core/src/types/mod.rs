//! Core types for iPobre.
//!
//! This module provides type-safe wrappers for the marketplace domain.

pub mod claim;
pub mod email;
pub mod id;
pub mod lifecycle;
pub mod money;
pub mod payment;
pub mod role;
pub mod status;
pub mod totals;

pub use claim::{ClaimPolicy, ClaimPolicyError};
pub use email::{Email, EmailError};
pub use id::*;
pub use lifecycle::{OrderRelation, TransitionError, authorize_transition};
pub use money::{Money, MoneyError};
pub use payment::{PaymentMethod, ProviderStatus, Settlement};
pub use role::UserRole;
pub use status::*;
pub use totals::{LineItem, OrderTotals, TotalsError};
