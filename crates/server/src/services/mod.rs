//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, profiles and bearer tokens
//! - `catalog` - Stores and products, with owner checks
//! - `orders` - Order placement, visibility, driver claim and status changes
//! - `payments` - PIX charges and provider settlement
//!
//! Services borrow the pool and gateway from `AppState` for the duration of
//! one request.

pub mod auth;
pub mod catalog;
pub mod orders;
pub mod payments;
