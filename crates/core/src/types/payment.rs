//! Payment method and provider status vocabulary.
//!
//! Provider notifications arrive in two vocabularies: the English one used by
//! the sandbox (`completed`, `refunded`) and the Banco Inter PIX one
//! (`CONCLUIDA`, `DEVOLVIDA`). Both collapse into [`ProviderStatus`].

use serde::{Deserialize, Serialize};

use super::status::{OrderStatus, PaymentStatus};

/// How an order is paid. PIX is the only supported rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Brazilian instant payment.
    #[default]
    Pix,
}

/// Status reported by the payment provider for a charge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderStatus {
    /// The payer completed the transfer.
    Completed,
    /// The transfer was returned to the payer.
    Refunded,
    /// Anything else (`ATIVA`, `REMOVIDA_PELO_USUARIO_RECEBEDOR`, ...).
    /// Acknowledged but never changes an order.
    Unknown(String),
}

/// What a provider status means for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Payment statuses the order must currently have for this to apply.
    pub expected_payment: &'static [PaymentStatus],
    /// Payment status to write.
    pub payment: PaymentStatus,
    /// Order status to move to, when the transition table allows it.
    pub order: OrderStatus,
}

impl ProviderStatus {
    /// Map a raw provider status string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            s if s.eq_ignore_ascii_case("completed") || s.eq_ignore_ascii_case("concluida") => {
                Self::Completed
            }
            s if s.eq_ignore_ascii_case("refunded") || s.eq_ignore_ascii_case("devolvida") => {
                Self::Refunded
            }
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The settlement this status triggers, if any.
    ///
    /// The expected payment statuses make the settlement idempotent: once a
    /// charge is `paid`, a replayed completion matches nothing.
    #[must_use]
    pub const fn settlement(&self) -> Option<Settlement> {
        match self {
            Self::Completed => Some(Settlement {
                expected_payment: &[PaymentStatus::Pending, PaymentStatus::Failed],
                payment: PaymentStatus::Paid,
                order: OrderStatus::Paid,
            }),
            Self::Refunded => Some(Settlement {
                expected_payment: &[PaymentStatus::Paid],
                payment: PaymentStatus::Refunded,
                order: OrderStatus::Cancelled,
            }),
            Self::Unknown(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for ProviderStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

impl std::fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Refunded => f.write_str("refunded"),
            Self::Unknown(raw) => write!(f, "unknown({raw})"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_both_vocabularies_map() {
        assert_eq!(ProviderStatus::parse("completed"), ProviderStatus::Completed);
        assert_eq!(ProviderStatus::parse("CONCLUIDA"), ProviderStatus::Completed);
        assert_eq!(ProviderStatus::parse("refunded"), ProviderStatus::Refunded);
        assert_eq!(ProviderStatus::parse("DEVOLVIDA"), ProviderStatus::Refunded);
        assert_eq!(
            ProviderStatus::parse("ATIVA"),
            ProviderStatus::Unknown("ATIVA".to_string())
        );
    }

    #[test]
    fn test_completion_settles_to_paid() {
        let settlement = ProviderStatus::Completed.settlement().unwrap();
        assert_eq!(settlement.payment, PaymentStatus::Paid);
        assert_eq!(settlement.order, OrderStatus::Paid);
        assert!(!settlement.expected_payment.contains(&PaymentStatus::Paid));
    }

    #[test]
    fn test_refund_only_applies_to_paid_charges() {
        let settlement = ProviderStatus::Refunded.settlement().unwrap();
        assert_eq!(settlement.expected_payment, &[PaymentStatus::Paid]);
        assert_eq!(settlement.order, OrderStatus::Cancelled);
    }

    #[test]
    fn test_unknown_status_settles_nothing() {
        assert!(ProviderStatus::parse("EM_PROCESSAMENTO").settlement().is_none());
    }

    #[test]
    fn test_deserialize_from_webhook_field() {
        let status: ProviderStatus = serde_json::from_str("\"Concluida\"").unwrap();
        assert_eq!(status, ProviderStatus::Completed);
    }
}
