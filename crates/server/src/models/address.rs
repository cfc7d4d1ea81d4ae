//! Postal address shared by users, stores and orders.

use serde::{Deserialize, Serialize};

/// A Brazilian street address, stored as JSONB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    /// Two-letter state code.
    pub state: String,
    /// CEP.
    pub zip_code: String,
}

impl Address {
    /// First required field that is blank, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("street", &self.street),
            ("number", &self.number),
            ("neighborhood", &self.neighborhood),
            ("city", &self.city),
            ("state", &self.state),
            ("zipCode", &self.zip_code),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_address_wire_format() {
        let address: Address = serde_json::from_value(serde_json::json!({
            "street": "Rua das Flores",
            "number": "42",
            "neighborhood": "Centro",
            "city": "Recife",
            "state": "PE",
            "zipCode": "50010-000"
        }))
        .unwrap();

        assert_eq!(address.zip_code, "50010-000");
        assert!(address.complement.is_none());
        assert!(address.missing_field().is_none());
    }

    #[test]
    fn test_missing_field_reports_blank_values() {
        let address = Address {
            street: "Rua A".to_string(),
            number: " ".to_string(),
            ..Address::default()
        };
        assert_eq!(address.missing_field(), Some("number"));
    }
}
