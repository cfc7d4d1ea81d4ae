//! Order total computation.

use serde::Serialize;

use super::money::{Money, MoneyError};

/// Why totals could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TotalsError {
    /// An order needs at least one line.
    #[error("order has no items")]
    Empty,
    /// A line asked for zero units.
    #[error("item quantity must be greater than zero")]
    ZeroQuantity,
    /// The subtotal is below the store's minimum order value.
    #[error("order subtotal {subtotal} is below the store minimum of {minimum}")]
    BelowMinimum {
        /// Computed subtotal.
        subtotal: Money,
        /// Store minimum.
        minimum: Money,
    },
    /// The total does not fit an order record.
    #[error("order total {0} exceeds the maximum allowed")]
    TooLarge(Money),
    /// Arithmetic overflow.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// One priced order line: the unit price captured at order time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
    /// Price of one unit when the order was placed.
    pub unit_price: Money,
    /// Units ordered.
    pub quantity: u32,
}

impl LineItem {
    /// `unit_price * quantity`.
    ///
    /// # Errors
    ///
    /// Returns `TotalsError::Money` on overflow.
    pub fn line_total(&self) -> Result<Money, TotalsError> {
        Ok(self.unit_price.times(self.quantity)?)
    }
}

/// Subtotal, delivery fee and total of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    /// Sum of line totals.
    pub subtotal: Money,
    /// Store delivery fee.
    pub delivery_fee: Money,
    /// `subtotal + delivery_fee`.
    pub total: Money,
}

impl OrderTotals {
    /// Compute totals for `items` with the store's `delivery_fee`.
    ///
    /// # Errors
    ///
    /// Returns `TotalsError::Empty` with no items, `ZeroQuantity` for any line
    /// with zero units, `TooLarge` past the storable maximum, and `Money` on
    /// overflow.
    pub fn compute(items: &[LineItem], delivery_fee: Money) -> Result<Self, TotalsError> {
        if items.is_empty() {
            return Err(TotalsError::Empty);
        }

        let mut subtotal = Money::ZERO;
        for item in items {
            if item.quantity == 0 {
                return Err(TotalsError::ZeroQuantity);
            }
            subtotal = subtotal.checked_add(item.line_total()?)?;
        }

        let total = subtotal.checked_add(delivery_fee)?;
        if total > Money::MAX {
            return Err(TotalsError::TooLarge(total));
        }

        Ok(Self {
            subtotal,
            delivery_fee,
            total,
        })
    }

    /// Reject a subtotal below the store's `minimum` order value.
    ///
    /// # Errors
    ///
    /// Returns `TotalsError::BelowMinimum`.
    pub fn ensure_minimum(&self, minimum: Money) -> Result<(), TotalsError> {
        if self.subtotal < minimum {
            return Err(TotalsError::BelowMinimum {
                subtotal: self.subtotal,
                minimum,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(centavos: u32, quantity: u32) -> LineItem {
        LineItem {
            unit_price: Money::from_centavos(centavos),
            quantity,
        }
    }

    #[test]
    fn test_two_units_plus_delivery_fee() {
        let totals = OrderTotals::compute(&[line(1000, 2)], Money::from_centavos(500)).unwrap();
        assert_eq!(totals.subtotal.to_fixed(), "20.00");
        assert_eq!(totals.delivery_fee.to_fixed(), "5.00");
        assert_eq!(totals.total.to_fixed(), "25.00");
    }

    #[test]
    fn test_several_lines_are_summed() {
        let totals =
            OrderTotals::compute(&[line(1990, 1), line(350, 3)], Money::ZERO).unwrap();
        assert_eq!(totals.subtotal, Money::from_centavos(3040));
        assert_eq!(totals.total, totals.subtotal);
    }

    #[test]
    fn test_empty_order_rejected() {
        assert_eq!(
            OrderTotals::compute(&[], Money::ZERO),
            Err(TotalsError::Empty)
        );
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert_eq!(
            OrderTotals::compute(&[line(1000, 1), line(500, 0)], Money::ZERO),
            Err(TotalsError::ZeroQuantity)
        );
    }

    #[test]
    fn test_oversized_total_rejected() {
        let result = OrderTotals::compute(&[line(99_999_999, u32::MAX)], Money::ZERO);
        assert!(matches!(result, Err(TotalsError::TooLarge(_))));

        let at_limit =
            OrderTotals::compute(&[line(99_999_999, 10_000)], Money::from_centavos(9_999)).unwrap();
        assert_eq!(at_limit.total.to_fixed(), "9999999999.99");
    }

    #[test]
    fn test_minimum_order_value() {
        let totals = OrderTotals::compute(&[line(1500, 1)], Money::ZERO).unwrap();
        assert!(totals.ensure_minimum(Money::from_centavos(1500)).is_ok());
        assert!(matches!(
            totals.ensure_minimum(Money::from_centavos(2000)),
            Err(TotalsError::BelowMinimum { .. })
        ));
    }
}
