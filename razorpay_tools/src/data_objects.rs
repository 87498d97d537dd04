use chrono::{DateTime, Utc};
use dpg_common::MinorUnits;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The body of a `POST /orders` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRazorpayOrder {
    pub amount: MinorUnits,
    pub currency: String,
    pub receipt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Value>,
}

impl NewRazorpayOrder {
    pub fn new(amount: MinorUnits, currency: &str, receipt: &str) -> Self {
        Self { amount, currency: currency.to_string(), receipt: receipt.to_string(), notes: None }
    }

    pub fn with_notes(mut self, notes: Value) -> Self {
        self.notes = Some(notes);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: MinorUnits,
    #[serde(default)]
    pub amount_paid: MinorUnits,
    #[serde(default)]
    pub amount_due: MinorUnits,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
    #[serde(default)]
    pub attempts: u32,
    pub created_at: i64,
}

impl RazorpayOrder {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created_at, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RazorpayPayment {
    pub id: String,
    pub amount: MinorUnits,
    pub currency: String,
    /// One of `created`, `authorized`, `captured`, `refunded` or `failed`.
    pub status: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub captured: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    pub created_at: i64,
}

impl RazorpayPayment {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created_at, 0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayErrorResponse {
    pub error: RazorpayErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayErrorDetail {
    pub code: String,
    #[serde(default)]
    pub description: String,
}
