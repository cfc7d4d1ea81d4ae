//! PIX charge gateways and webhook authentication.
//!
//! # Gateways
//!
//! - [`SandboxGateway`] builds a valid-looking BR Code locally from the
//!   transaction id and amount. Used in development and tests; enables the
//!   mock settlement route.
//! - [`InterClient`] talks to the Banco Inter PIX API (`PUT /pix/v2/cob/{txid}`)
//!   with an OAuth2 client-credentials token cached in `moka`.
//!
//! Either way the gateway only issues charges. Settlement arrives later via
//! the signed webhook (see [`webhook`]).

mod inter;
mod sandbox;
pub mod webhook;

pub use inter::InterClient;
pub use sandbox::SandboxGateway;

use ipobre_core::{Money, OrderId};
use thiserror::Error;

use crate::config::{PixConfig, PixMode};

/// Errors from the PIX provider.
#[derive(Debug, Error)]
pub enum PixError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Access token could not be obtained.
    #[error("token error: {0}")]
    Token(String),

    /// Gateway is missing configuration for its mode.
    #[error("gateway misconfigured: {0}")]
    Config(String),
}

/// What the gateway needs to issue a charge.
#[derive(Debug, Clone, Copy)]
pub struct ChargeRequest<'a> {
    /// Order being paid.
    pub order_id: OrderId,
    /// Transaction id chosen at order creation.
    pub txid: &'a str,
    /// Amount to charge.
    pub amount: Money,
}

/// An issued charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    /// Transaction id as echoed by the provider.
    pub txid: String,
    /// PIX copy-and-paste code (BR Code).
    pub copy_paste: String,
    /// Base64 PNG of the QR code, when the provider returns one.
    pub qr_code_png: Option<String>,
}

/// Configured PIX backend.
#[derive(Clone)]
pub enum PixGateway {
    /// Local deterministic charges.
    Sandbox(SandboxGateway),
    /// Banco Inter.
    Inter(InterClient),
}

impl PixGateway {
    /// Build the gateway selected by `PIX_MODE`.
    ///
    /// # Errors
    ///
    /// Returns `PixError::Config` if Inter mode lacks credentials or the
    /// client certificate is unusable.
    pub fn from_config(config: &PixConfig) -> Result<Self, PixError> {
        match config.mode {
            PixMode::Sandbox => Ok(Self::Sandbox(SandboxGateway::new())),
            PixMode::Inter => {
                let inter = config
                    .inter
                    .as_ref()
                    .ok_or_else(|| PixError::Config("Inter credentials missing".to_string()))?;
                Ok(Self::Inter(InterClient::new(inter)?))
            }
        }
    }

    /// Whether charges are simulated locally.
    #[must_use]
    pub const fn is_sandbox(&self) -> bool {
        matches!(self, Self::Sandbox(_))
    }

    /// Issue a charge for an order.
    ///
    /// # Errors
    ///
    /// Returns `PixError` when the provider cannot issue the charge.
    #[tracing::instrument(skip(self), fields(order_id = %request.order_id, amount = %request.amount))]
    pub async fn create_charge(&self, request: ChargeRequest<'_>) -> Result<Charge, PixError> {
        match self {
            Self::Sandbox(sandbox) => Ok(sandbox.create_charge(request)),
            Self::Inter(inter) => inter.create_charge(request).await,
        }
    }
}

/// Generate a fresh transaction id: 32 lowercase hex characters, within the
/// 26..=35 alphanumeric range PIX accepts.
#[must_use]
pub fn new_txid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
