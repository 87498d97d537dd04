use dpg_common::Secret;
use log::*;

pub const DEFAULT_RAZORPAY_API_URL: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone, Default)]
pub struct RazorpayConfig {
    /// The public key id. This is also handed to the checkout widget.
    pub key_id: String,
    /// The API key secret. Used for basic auth and to sign checkout payment confirmations.
    pub key_secret: Secret<String>,
    pub api_url: String,
}

impl RazorpayConfig {
    pub fn new(key_id: &str, key_secret: Secret<String>) -> Self {
        Self { key_id: key_id.to_string(), key_secret, api_url: DEFAULT_RAZORPAY_API_URL.to_string() }
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn new_from_env_or_default() -> Self {
        let key_id = std::env::var("DPG_RAZORPAY_KEY_ID").unwrap_or_else(|_| {
            warn!("DPG_RAZORPAY_KEY_ID not set, using (probably useless) default");
            "rzp_test_00000000000000".to_string()
        });
        let key_secret = Secret::new(std::env::var("DPG_RAZORPAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("DPG_RAZORPAY_KEY_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        let api_url = std::env::var("DPG_RAZORPAY_API_URL").unwrap_or_else(|_| {
            info!("DPG_RAZORPAY_API_URL not set, using {DEFAULT_RAZORPAY_API_URL}");
            DEFAULT_RAZORPAY_API_URL.to_string()
        });
        Self::new(&key_id, key_secret).with_api_url(&api_url)
    }
}
