//! Store domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use ipobre_core::{Money, StoreId, UserId};

use super::Address;

/// Opening and closing time for one weekday (`"08:00"`, `"22:30"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: String,
    pub close: String,
}

/// Weekly opening hours; a missing day means closed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thursday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<DayHours>,
}

/// A store listed in the directory.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    /// Owning account. Never changes after creation.
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub cover_image: Option<String>,
    pub category: String,
    pub address: Option<Json<Address>>,
    pub opening_hours: Option<Json<OpeningHours>>,
    pub is_open: bool,
    pub rating: Decimal,
    pub delivery_fee: Money,
    pub minimum_order: Option<Money>,
    pub created_at: DateTime<Utc>,
}

/// Store creation body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub opening_hours: Option<OpeningHours>,
    #[serde(default)]
    pub is_open: bool,
    #[serde(default)]
    pub delivery_fee: Money,
    #[serde(default)]
    pub minimum_order: Option<Money>,
}

/// Partial store update; omitted fields keep their current values.
///
/// Ownership and rating are not client-editable.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub cover_image: Option<String>,
    pub address: Option<Address>,
    pub opening_hours: Option<OpeningHours>,
    pub is_open: Option<bool>,
    pub delivery_fee: Option<Money>,
    pub minimum_order: Option<Money>,
}
