//! Domain models for the marketplace API.
//!
//! Row types double as response bodies; request bodies live next to the row
//! they create or update. Every wire shape uses camelCase keys.

pub mod address;
pub mod order;
pub mod product;
pub mod store;
pub mod user;

pub use address::Address;
pub use order::{NewOrder, NewOrderItem, Order, OrderDetail, OrderItem, StatusUpdate};
pub use product::{NewProduct, Product, ProductUpdate};
pub use store::{DayHours, NewStore, OpeningHours, Store, StoreUpdate};
pub use user::{NewUser, ProfileUpdate, User};
