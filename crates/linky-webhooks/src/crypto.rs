//! Secret generation and HMAC-SHA256 payload signing.
//!
//! The signature covers the raw request body only and is sent as
//! `X-Webhook-Signature: sha256=<hex>`.

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of entropy in a generated endpoint secret (256 bits).
pub const SECRET_BYTES: usize = 32;

/// Prefix of the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Generate a fresh endpoint secret: 32 random bytes from the OS CSPRNG,
/// hex-encoded (64 characters).
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hex-encoded HMAC-SHA256 of `body` keyed with `secret`.
#[must_use]
pub fn compute_signature(secret: &[u8], body: &[u8]) -> String {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Full `X-Webhook-Signature` header value for `body`.
#[must_use]
pub fn signature_header(secret: &[u8], body: &[u8]) -> String {
    format!("{SIGNATURE_PREFIX}{}", compute_signature(secret, body))
}

/// Check an `X-Webhook-Signature` header value against `body`.
///
/// For receivers: compares in constant time and rejects anything not of the
/// form `sha256=<hex>`.
#[must_use]
pub fn verify_signature(secret: &[u8], body: &[u8], header_value: &str) -> bool {
    let Some(provided) = header_value.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let computed = compute_signature(secret, body);
    constant_time_eq(
        provided.to_ascii_lowercase().as_bytes(),
        computed.as_bytes(),
    )
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}
