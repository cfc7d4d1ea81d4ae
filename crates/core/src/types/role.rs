//! Account roles.

use serde::{Deserialize, Serialize};

/// The role an account plays in the marketplace.
///
/// Assigned at registration and carried inside access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Places orders.
    #[default]
    Customer,
    /// Owns stores and their catalog.
    Store,
    /// Claims and delivers orders.
    Driver,
}

impl UserRole {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Store => "store",
            Self::Driver => "driver",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "store" => Ok(Self::Store),
            "driver" => Ok(Self::Driver),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}
