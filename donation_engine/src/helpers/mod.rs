mod signatures;

pub use signatures::{
    calculate_hmac_sha256,
    payment_signature_message,
    verify_payment_signature,
    verify_webhook_signature,
};
