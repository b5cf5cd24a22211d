//! Webhook payload authentication (HMAC-SHA256).
//!
//! The source platform signs each delivery with a shared secret and sends the
//! result in the `X-Hub-Signature-256` header as `sha256=<hex>`. Verification
//! runs before any parsing or storage; the comparison is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The header value prefix the source platform uses.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Signs a payload, returning a complete header value (`sha256=<hex>`).
///
/// Used by tests and by tooling that replays deliveries.
pub fn sign_payload(payload: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Verifies a delivery signature header against the payload and secret.
///
/// Returns `false` for malformed headers (wrong prefix, bad hex) as well as
/// for signature mismatches; never panics.
pub fn verify_payload(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(hex_digest) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(claimed) = hex::decode(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    // verify_slice is constant-time
    mac.verify_slice(&claimed).is_ok()
}
