//! Local PIX charges for development.
//!
//! Produces a static-format BR Code (EMV merchant-presented QR payload) with a
//! correct CRC, so wallets and decoders parse it, but no bank ever sees it.

use std::fmt::Write as _;

use crc::{CRC_16_IBM_3740, Crc};

use super::{Charge, ChargeRequest};

const SANDBOX_PIX_KEY: &str = "123e4567-e89b-12d3-a456-426614174000";
const MERCHANT_NAME: &str = "iPobre Food";
const MERCHANT_CITY: &str = "Sao Paulo";

/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF), as EMV QR requires.
const BR_CODE_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// 1x1 transparent PNG standing in for the QR image.
const SAMPLE_QR_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

/// Deterministic gateway: the same txid and amount always give the same code.
#[derive(Debug, Clone, Default)]
pub struct SandboxGateway;

impl SandboxGateway {
    /// Create a sandbox gateway.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Issue a local charge.
    #[must_use]
    pub fn create_charge(&self, request: ChargeRequest<'_>) -> Charge {
        tracing::debug!(txid = request.txid, "Issuing sandbox PIX charge");
        Charge {
            txid: request.txid.to_string(),
            copy_paste: br_code(SANDBOX_PIX_KEY, &request.amount.to_fixed(), request.txid),
            qr_code_png: Some(SAMPLE_QR_PNG.to_string()),
        }
    }
}

/// Build a BR Code payload for `key`, `amount` (`"25.00"`) and `txid`.
fn br_code(key: &str, amount: &str, txid: &str) -> String {
    let merchant_account = [field("00", "br.gov.bcb.pix"), field("01", key)].concat();
    // Reference label is capped at 25 characters.
    let reference: String = txid.chars().take(25).collect();

    let mut payload = String::new();
    payload.push_str(&field("00", "01"));
    payload.push_str(&field("26", &merchant_account));
    payload.push_str(&field("52", "0000"));
    payload.push_str(&field("53", "986"));
    payload.push_str(&field("54", amount));
    payload.push_str(&field("58", "BR"));
    payload.push_str(&field("59", MERCHANT_NAME));
    payload.push_str(&field("60", MERCHANT_CITY));
    payload.push_str(&field("62", &field("05", &reference)));
    payload.push_str("6304");

    let crc = BR_CODE_CRC.checksum(payload.as_bytes());
    let _ = write!(payload, "{crc:04X}");
    payload
}

/// One EMV TLV field: id, two-digit length, value.
fn field(id: &str, value: &str) -> String {
    format!("{id}{:02}{value}", value.len())
}
