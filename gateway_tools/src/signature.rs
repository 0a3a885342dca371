//! Webhook signature verification for the card processor.
//!
//! The processor signs each delivery with HMAC-SHA256 over `"{timestamp}.{raw body}"`, keyed with the endpoint's
//! webhook secret, and sends the result in a header of the form
//!
//! ```text
//! Stripe-Signature: t=1700000000,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
//! ```
//!
//! More than one `v1` entry may be present while a secret is being rolled. Any one of them matching is sufficient.
use hmac::{Hmac, Mac};
use log::{trace, warn};
use sha2::Sha256;

use crate::GatewayApiError;

pub const CARD_SIGNATURE_HEADER: &str = "Stripe-Signature";

type HmacSha256 = Hmac<Sha256>;

fn keyed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, GatewayApiError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| GatewayApiError::InvalidSignature(format!("unusable webhook secret. {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Computes the hex-encoded signature for `payload` at `timestamp`.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, GatewayApiError> {
    let mac = keyed_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds a complete signature header value. Useful for tests and for replaying deliveries.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, GatewayApiError> {
    Ok(format!("t={timestamp},v1={}", sign_payload(secret, timestamp, payload)?))
}

/// Verifies a signature header against the raw body.
///
/// `now` and `tolerance_secs` guard against replays of old deliveries. A tolerance of zero disables the check.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), GatewayApiError> {
    if secret.is_empty() {
        warn!("🔌️ No webhook secret is configured. Rejecting webhook.");
        return Err(GatewayApiError::InvalidSignature("no webhook secret configured".into()));
    }
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => signatures.push(v),
            _ => {},
        }
    }
    let timestamp =
        timestamp.ok_or_else(|| GatewayApiError::InvalidSignature("missing or invalid timestamp".into()))?;
    if signatures.is_empty() {
        return Err(GatewayApiError::InvalidSignature("no v1 signature in header".into()));
    }
    if tolerance_secs > 0 && (now - timestamp).abs() > tolerance_secs {
        return Err(GatewayApiError::InvalidSignature(format!("timestamp {timestamp} is outside the tolerance")));
    }
    let matched = signatures.iter().any(|sig| {
        let Ok(expected) = hex::decode(sig) else {
            return false;
        };
        keyed_mac(secret, timestamp, payload).is_ok_and(|mac| mac.verify_slice(&expected).is_ok())
    });
    if matched {
        trace!("🔌️ Webhook signature verified");
        Ok(())
    } else {
        Err(GatewayApiError::InvalidSignature("no signature matched the payload".into()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;

    #[test]
    fn valid_signature_is_accepted() {
        let header = signature_header(SECRET, 1_700_000_000, BODY).unwrap();
        assert!(verify_signature(SECRET, BODY, &header, 1_700_000_010, 300).is_ok());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = signature_header(SECRET, 1_700_000_000, BODY).unwrap();
        let err = verify_signature(SECRET, b"{}", &header, 1_700_000_000, 300).unwrap_err();
        assert!(matches!(err, GatewayApiError::InvalidSignature(_)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = signature_header("another", 1_700_000_000, BODY).unwrap();
        assert!(verify_signature(SECRET, BODY, &header, 1_700_000_000, 300).is_err());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let header = signature_header(SECRET, 1_700_000_000, BODY).unwrap();
        assert!(verify_signature(SECRET, BODY, &header, 1_700_001_000, 300).is_err());
        assert!(verify_signature(SECRET, BODY, &header, 1_700_001_000, 0).is_ok());
    }

    #[test]
    fn malformed_headers() {
        assert!(verify_signature(SECRET, BODY, "", 0, 0).is_err());
        assert!(verify_signature(SECRET, BODY, "t=abc,v1=00", 0, 0).is_err());
        assert!(verify_signature(SECRET, BODY, "t=1", 0, 0).is_err());
        assert!(verify_signature(SECRET, BODY, "t=1,v1=nothex", 0, 0).is_err());
        assert!(verify_signature("", BODY, &signature_header("", 1, BODY).unwrap(), 1, 0).is_err());
    }

    #[test]
    fn rolled_secret_with_multiple_signatures() {
        let good = sign_payload(SECRET, 1_700_000_000, BODY).unwrap();
        let header = format!("t=1700000000,v1=deadbeef,v1={good}");
        assert!(verify_signature(SECRET, BODY, &header, 1_700_000_000, 300).is_ok());
    }
}
