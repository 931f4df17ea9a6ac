//! Slack request signing (`X-Slack-Signature`, version `v0`).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Requests older than this are rejected to limit replay
const MAX_AGE_SECS: u64 = 60 * 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("request timestamp is not a unix time: {0}")]
    BadTimestamp(String),

    #[error("request timestamp is too old or too far in the future")]
    Stale,

    #[error("signature is not a v0 hex digest")]
    Malformed,

    #[error("signature does not match")]
    Mismatch,
}

fn mac_for(signing_secret: &str, timestamp: &str, body: &[u8]) -> HmacSha256 {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC can take any key size");
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac
}

/// Compute the `v0=...` signature Slack would send for this request
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
    let digest = mac_for(signing_secret, timestamp, body).finalize().into_bytes();
    format!("v0={}", data_encoding::HEXLOWER.encode(&digest))
}

/// Check a request against the signing secret. `now` is the current unix time.
pub fn verify(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::BadTimestamp(timestamp.to_string()))?;
    if now.abs_diff(sent_at) > MAX_AGE_SECS {
        return Err(SignatureError::Stale);
    }

    let hex = signature
        .strip_prefix("v0=")
        .ok_or(SignatureError::Malformed)?;
    let expected = data_encoding::HEXLOWER_PERMISSIVE
        .decode(hex.as_bytes())
        .map_err(|_| SignatureError::Malformed)?;

    mac_for(signing_secret, timestamp, body)
        .verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}
