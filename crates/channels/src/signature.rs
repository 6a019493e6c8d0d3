//! HMAC-SHA256 webhook signature verification.
//!
//! Providers sign the raw request body and send the digest in a header as
//! `sha256=<hex>`. Verification recomputes the digest over the exact bytes
//! received and compares in constant time.

use hmac::{Hmac, Mac};
use invite_core::{InviteError, InviteResult};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const HEADER_PREFIX: &str = "sha256=";

/// Hex digest over `body`, as it would appear after the header prefix.
pub fn generate_signature(secret: &str, body: &[u8]) -> InviteResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| InviteError::SignatureInvalid)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `sha256=<hex>` signature header against the raw body.
pub fn verify_header(secret: &str, body: &[u8], header: &str) -> InviteResult<()> {
    let presented = header
        .strip_prefix(HEADER_PREFIX)
        .ok_or(InviteError::SignatureInvalid)?;
    let presented = hex::decode(presented).map_err(|_| InviteError::SignatureInvalid)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| InviteError::SignatureInvalid)?;
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    if constant_time_eq(&presented, &expected) {
        Ok(())
    } else {
        Err(InviteError::SignatureInvalid)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
