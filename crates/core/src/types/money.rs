//! Monetary amounts in Brazilian reais.
//!
//! Amounts are `rust_decimal::Decimal` values rounded to centavos. Floating
//! point never touches prices, so `10.00 * 2 + 5.00` is exactly `25.00`.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places kept for every amount.
const SCALE: u32 = 2;

/// Errors that can occur when constructing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount is below zero.
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),
    /// Arithmetic overflowed the decimal range.
    #[error("amount overflow")]
    Overflow,
}

/// A non-negative amount of money in BRL, rounded to two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero reais.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest amount an order record stores (`NUMERIC(12,2)`).
    // 999_999_999_999 at scale 2 (`Decimal::new` is not `const`).
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, SCALE));

    /// Create an amount, rounding half-even to centavos.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        Ok(Self(
            amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointNearestEven),
        ))
    }

    /// Create an amount from a whole number of centavos.
    #[must_use]
    pub fn from_centavos(centavos: u32) -> Self {
        Self(Decimal::new(i64::from(centavos), SCALE))
    }

    /// Multiply a unit price by a quantity.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the result does not fit.
    pub fn times(self, quantity: u32) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Add two amounts, failing on overflow.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the result does not fit.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Format with two decimals, the form PIX providers expect (`"25.00"`).
    #[must_use]
    pub fn to_fixed(&self) -> String {
        format!("{:.2}", self.0)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R$ {:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn brl(s: &str) -> Money {
        Money::new(Decimal::from_str(s).unwrap()).unwrap()
    }

    #[test]
    fn test_rejects_negative() {
        let err = Money::new(Decimal::from_str("-0.01").unwrap()).unwrap_err();
        assert!(matches!(err, MoneyError::Negative(_)));
    }

    #[test]
    fn test_rounds_to_centavos() {
        assert_eq!(brl("10.005").0, Decimal::from_str("10.00").unwrap());
        assert_eq!(brl("10.015").0, Decimal::from_str("10.02").unwrap());
    }

    #[test]
    fn test_times_and_add_are_exact() {
        let total = brl("0.10")
            .times(3)
            .unwrap()
            .checked_add(brl("0.20"))
            .unwrap();
        assert_eq!(total, brl("0.50"));
    }

    #[test]
    fn test_to_fixed_and_display() {
        assert_eq!(Money::from_centavos(2500).to_fixed(), "25.00");
        assert_eq!(Money::from_centavos(799).to_string(), "R$ 7.99");
    }

    #[test]
    fn test_deserialize_from_string_or_number() {
        let from_str: Money = serde_json::from_str("\"12.50\"").unwrap();
        let from_num: Money = serde_json::from_str("12.5").unwrap();
        assert_eq!(from_str, from_num);
        assert!(serde_json::from_str::<Money>("\"-1\"").is_err());
    }
}
