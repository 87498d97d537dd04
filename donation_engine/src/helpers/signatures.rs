//! # Gateway signature checks
//!
//! The gateway authenticates two kinds of evidence with HMAC-SHA256, each under its own shared secret:
//!
//! * **Payment signatures** are handed to the donor's browser after checkout and relayed to us on the client
//!   verification call. The signed message is `{order_id}|{payment_id}`, keyed with the API key secret.
//! * **Webhook signatures** arrive in the `X-Razorpay-Signature` header. The signed message is the raw request body,
//!   exactly as received, keyed with the webhook secret.
//!
//! In both cases the signature is the lowercase hex encoding of the MAC. Comparisons are constant-time, and a
//! signature that is not valid hex or has the wrong length simply fails verification.
use hmac::{Hmac, Mac};
use log::{debug, trace};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Checks the signature the checkout widget produced for `order_id` and `payment_id`.
pub fn verify_payment_signature(order_id: &str, payment_id: &str, signature: &str, secret: &[u8]) -> bool {
    let message = payment_signature_message(order_id, payment_id);
    let result = verify_hmac_sha256(message.as_bytes(), signature, secret);
    trace!("🔐️ Payment signature for {order_id}/{payment_id} valid: {result}");
    result
}

/// Checks a webhook signature against the exact bytes of the request body.
pub fn verify_webhook_signature(raw_body: &[u8], signature: &str, secret: &[u8]) -> bool {
    let result = verify_hmac_sha256(raw_body, signature, secret);
    trace!("🔐️ Webhook signature over {} bytes valid: {result}", raw_body.len());
    result
}

pub fn payment_signature_message(order_id: &str, payment_id: &str) -> String {
    format!("{order_id}|{payment_id}")
}

/// Produces the lowercase hex HMAC-SHA256 of `data`. This is what the gateway sends, so it is handy for tests and
/// tooling.
pub fn calculate_hmac_sha256(data: &[u8], secret: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::default(),
    };
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

fn verify_hmac_sha256(data: &[u8], signature: &str, secret: &[u8]) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        debug!("🔐️ Signature is not valid hex");
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}
