//! Webhook request authentication.
//!
//! The payment bridge signs each notification with a shared secret:
//!
//! ```text
//! x-pix-timestamp: 1718000000
//! x-pix-signature: v1=<hex hmac_sha256(secret, "v1:{timestamp}:{raw body}")>
//! ```
//!
//! Requests older or newer than five minutes are rejected.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

/// Header carrying the Unix timestamp the request was signed at.
pub const TIMESTAMP_HEADER: &str = "x-pix-timestamp";
/// Header carrying the versioned signature.
pub const SIGNATURE_HEADER: &str = "x-pix-signature";

/// Maximum clock skew accepted, in seconds.
const MAX_SKEW_SECS: i64 = 300;
const SIGNATURE_PREFIX: &str = "v1=";

/// Why a webhook signature was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// A signature header is missing.
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    /// Timestamp is not an integer.
    #[error("invalid timestamp")]
    InvalidTimestamp,

    /// Timestamp is outside the accepted window.
    #[error("request timestamp outside tolerance")]
    Stale,

    /// Signature is malformed or does not match.
    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a signed webhook body.
///
/// `now` is the current Unix time in seconds.
///
/// # Errors
///
/// Returns `SignatureError` if the timestamp is malformed or stale, or the
/// signature does not match the body.
pub fn verify_signature(
    secret: &SecretString,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let ts: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;

    if now.abs_diff(ts) > MAX_SKEW_SECS.unsigned_abs() {
        return Err(SignatureError::Stale);
    }

    let provided = signature
        .trim()
        .strip_prefix(SIGNATURE_PREFIX)
        .and_then(|h| hex::decode(h).ok())
        .ok_or(SignatureError::Mismatch)?;

    mac_for(secret, timestamp.trim(), body)
        .verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

/// Produce the `x-pix-signature` value for a body.
#[must_use]
pub fn sign(secret: &SecretString, timestamp: &str, body: &[u8]) -> String {
    let mac = mac_for(secret, timestamp, body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

fn mac_for(secret: &SecretString, timestamp: &str, body: &[u8]) -> Hmac<Sha256> {
    // HMAC accepts keys of any length.
    #[allow(clippy::expect_used)]
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(b"v1:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_718_000_000;

    fn secret() -> SecretString {
        SecretString::from("whsec-test-0f9a8b7c6d5e4f3a2b1c0d9e8f7a6b5c".to_string())
    }

    #[test]
    fn test_valid_signature() {
        let body = br#"{"txId":"abc","status":"CONCLUIDA"}"#;
        let signature = sign(&secret(), "1718000000", body);
        assert!(signature.starts_with("v1="));
        assert_eq!(
            verify_signature(&secret(), "1718000000", body, &signature, NOW),
            Ok(())
        );
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signature = sign(&secret(), "1718000000", br#"{"status":"CONCLUIDA"}"#);
        assert_eq!(
            verify_signature(
                &secret(),
                "1718000000",
                br#"{"status":"DEVOLVIDA"}"#,
                &signature,
                NOW
            ),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = SecretString::from("another-secret".to_string());
        let signature = sign(&other, "1718000000", b"{}");
        assert_eq!(
            verify_signature(&secret(), "1718000000", b"{}", &signature, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let signature = sign(&secret(), "1717999000", b"{}");
        assert_eq!(
            verify_signature(&secret(), "1717999000", b"{}", &signature, NOW),
            Err(SignatureError::Stale)
        );
        // Edge of the window is still accepted.
        let signature = sign(&secret(), "1717999700", b"{}");
        assert!(verify_signature(&secret(), "1717999700", b"{}", &signature, NOW).is_ok());
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        assert_eq!(
            verify_signature(&secret(), "yesterday", b"{}", "v1=00", NOW),
            Err(SignatureError::InvalidTimestamp)
        );
        let signature = sign(&secret(), "1718000000", b"{}");
        let unprefixed = signature.trim_start_matches("v1=");
        assert_eq!(
            verify_signature(&secret(), "1718000000", b"{}", unprefixed, NOW),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature(&secret(), "1718000000", b"{}", "v1=not-hex", NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_extreme_timestamps_are_stale() {
        for ts in [i64::MIN, i64::MAX] {
            assert_eq!(
                verify_signature(&secret(), &ts.to_string(), b"{}", "v1=00", NOW),
                Err(SignatureError::Stale)
            );
        }
    }
}
