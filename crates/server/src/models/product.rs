//! Product domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ipobre_core::{Money, ProductId, StoreId};

/// A catalog entry belonging to one store.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub image: Option<String>,
    pub category: Option<String>,
    pub ingredients: Vec<String>,
    pub available: bool,
    /// Minutes.
    pub preparation_time: Option<i32>,
    pub promotional_price: Option<Money>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Price charged right now: the promotional price when it undercuts the
    /// list price.
    #[must_use]
    pub fn effective_price(&self) -> Money {
        match self.promotional_price {
            Some(promo) if promo < self.price => promo,
            _ => self.price,
        }
    }
}

/// Product creation body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub store_id: StoreId,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub preparation_time: Option<i32>,
    #[serde(default)]
    pub promotional_price: Option<Money>,
}

const fn default_available() -> bool {
    true
}

/// Partial product update. The owning store cannot change.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub available: Option<bool>,
    pub preparation_time: Option<i32>,
    pub promotional_price: Option<Money>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(price: u32, promo: Option<u32>) -> Product {
        Product {
            id: ProductId::new(1),
            store_id: StoreId::new(1),
            name: "X-Tudo".to_string(),
            description: None,
            price: Money::from_centavos(price),
            image: None,
            category: Some("lanches".to_string()),
            ingredients: vec![],
            available: true,
            preparation_time: Some(15),
            promotional_price: promo.map(Money::from_centavos),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_price_prefers_lower_promotion() {
        assert_eq!(product(2500, Some(1990)).effective_price(), Money::from_centavos(1990));
        assert_eq!(product(2500, Some(3000)).effective_price(), Money::from_centavos(2500));
        assert_eq!(product(2500, None).effective_price(), Money::from_centavos(2500));
    }

    #[test]
    fn test_new_product_defaults_to_available() {
        let body: NewProduct = serde_json::from_value(serde_json::json!({
            "storeId": 3,
            "name": "Coxinha",
            "price": "6.50"
        }))
        .unwrap();
        assert!(body.available);
        assert_eq!(body.store_id, StoreId::new(3));
        assert_eq!(body.price.to_fixed(), "6.50");
    }
}
