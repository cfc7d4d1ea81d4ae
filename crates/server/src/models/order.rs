//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use ipobre_core::{
    Money, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, StoreId,
    UserId,
};

use super::Address;

/// An order row. Totals are fixed at creation and never recomputed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub store_id: StoreId,
    pub driver_id: Option<UserId>,
    pub status: OrderStatus,
    pub delivery_address: Json<Address>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Provider transaction id the webhook refers back to.
    #[serde(rename = "txId")]
    pub pix_txid: String,
    /// PIX copy-and-paste code.
    pub pix_code: Option<String>,
    /// Base64 PNG of the QR code.
    pub pix_qr_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of an order, priced when the order was placed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
    pub notes: Option<String>,
}

/// An order together with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// One requested line of a new order. Prices always come from the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Order placement body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub store_id: StoreId,
    pub items: Vec<NewOrderItem>,
    pub delivery_address: Address,
}

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}
