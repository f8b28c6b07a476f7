//! `Stripe-Signature` header verification.
//!
//! The header carries a timestamp and one or more `v1` HMAC-SHA256 digests of
//! `"{timestamp}.{raw body}"` keyed with the endpoint secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing timestamp in signature header")]
    MissingTimestamp,
    #[error("missing v1 signature in header")]
    MissingSignature,
    #[error("timestamp outside tolerance window")]
    OutsideTolerance,
    #[error("no signature matches the payload")]
    Mismatch,
    #[error("unusable webhook secret")]
    Key,
}

/// Checks `header` against the raw `payload`. `now` is a unix timestamp in seconds.
pub fn verify(header: &str, payload: &[u8], secret: &str, tolerance: Duration, now: i64) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if candidates.is_empty() { return Err(SignatureError::MissingSignature); }
    if now.abs_diff(timestamp) > tolerance.as_secs() { return Err(SignatureError::OutsideTolerance); }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Key)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = candidates.iter().filter_map(|c| hex::decode(c).ok()).any(|digest| mac.clone().verify_slice(&digest).is_ok());
    if matched { Ok(()) } else { Err(SignatureError::Mismatch) }
}

/// Produces a header value `verify` accepts; used to sign test deliveries.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return format!("t={timestamp}"),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
