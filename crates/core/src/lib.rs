//! iPobre Core - Shared domain types.
//!
//! This crate provides the types shared by every iPobre component:
//! - `server` - The delivery marketplace HTTP API
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. The order state machine, the driver claim policy
//! and the order total arithmetic all live here so they can be tested without
//! a running database.
//!
//! # Modules
//!
//! - [`types`] - Ids, money, emails, roles, statuses and the lifecycle rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
