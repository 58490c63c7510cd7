//! GitHub webhook signature verification.
//!
//! GitHub signs every delivery with HMAC-SHA256 over the raw request body,
//! keyed by the webhook's shared secret, and sends the hex digest in the
//! `X-Hub-Signature-256` header as `sha256=<hex>`.
//!
//! Both functions here are pure: no I/O, no shared state.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Prefix GitHub puts in front of the hex digest.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Name of the header carrying the signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Verify a delivery's signature header against the raw body.
///
/// Returns `false` (never panics) when:
/// - `secret` is empty
/// - `signature_header` is empty or lacks the `sha256=` prefix
/// - the digest does not match
///
/// The hex digests are compared with [`ConstantTimeEq`] so that a mismatch
/// position cannot be learned from response timing.
pub fn verify(secret: &str, raw_body: &[u8], signature_header: &str) -> bool {
    if secret.is_empty() || signature_header.is_empty() {
        return false;
    }

    let Some(received) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let received = received.trim();

    let Some(expected) = hex_digest(secret, raw_body) else {
        return false;
    };

    // Length is not secret; only the content comparison must be constant time.
    if received.len() != expected.len() {
        return false;
    }

    received.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Produce the `sha256=<hex>` header value for a body.
///
/// Used by the test-delivery tooling and by tests; the server only verifies.
pub fn sign(secret: &str, raw_body: &[u8]) -> String {
    let digest = hex_digest(secret, raw_body).unwrap_or_default();
    format!("{}{}", SIGNATURE_PREFIX, digest)
}

fn hex_digest(secret: &str, raw_body: &[u8]) -> Option<String> {
    // HMAC accepts keys of any length; this only fails for broken key types.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(raw_body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
