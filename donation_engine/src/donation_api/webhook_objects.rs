use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::{DonationId, MinorUnits, OrderId, PaymentId};

/// The event types the engine acts on. Anything else is acknowledged and left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    PaymentCaptured,
    OrderPaid,
    PaymentFailed,
    PaymentAuthorized,
    RefundCreated,
    RefundProcessed,
    Other(String),
}

impl From<&str> for WebhookEventKind {
    fn from(value: &str) -> Self {
        match value {
            "payment.captured" => Self::PaymentCaptured,
            "order.paid" => Self::OrderPaid,
            "payment.failed" => Self::PaymentFailed,
            "payment.authorized" => Self::PaymentAuthorized,
            "refund.created" => Self::RefundCreated,
            "refund.processed" => Self::RefundProcessed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for WebhookEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PaymentCaptured => write!(f, "payment.captured"),
            Self::OrderPaid => write!(f, "order.paid"),
            Self::PaymentFailed => write!(f, "payment.failed"),
            Self::PaymentAuthorized => write!(f, "payment.authorized"),
            Self::RefundCreated => write!(f, "refund.created"),
            Self::RefundProcessed => write!(f, "refund.processed"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl WebhookEnvelope {
    pub fn kind(&self) -> WebhookEventKind {
        WebhookEventKind::from(self.event.as_str())
    }

    pub fn payment(&self) -> Option<&PaymentEntity> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }

    pub fn refund(&self) -> Option<&RefundEntity> {
        self.payload.refund.as_ref().map(|r| &r.entity)
    }

    pub fn order(&self) -> Option<&OrderEntity> {
        self.payload.order.as_ref().map(|o| &o.entity)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<Entity<PaymentEntity>>,
    #[serde(default)]
    pub refund: Option<Entity<RefundEntity>>,
    #[serde(default)]
    pub order: Option<Entity<OrderEntity>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entity<T> {
    pub entity: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    pub id: PaymentId,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub amount: MinorUnits,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_reason: Option<String>,
}

impl PaymentEntity {
    /// A human-readable failure reason built from the gateway's error fields.
    pub fn failure_reason(&self) -> String {
        match (&self.error_code, &self.error_description) {
            (Some(code), Some(description)) => format!("{code}: {description}"),
            (Some(code), None) => code.clone(),
            (None, Some(description)) => description.clone(),
            (None, None) => self.error_reason.clone().unwrap_or_else(|| "payment failed".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundEntity {
    pub id: String,
    pub payment_id: PaymentId,
    pub amount: MinorUnits,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderEntity {
    pub id: OrderId,
    pub amount: MinorUnits,
    #[serde(default)]
    pub amount_paid: Option<MinorUnits>,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
}

/// The per-event result returned to the gateway in the body of a 200 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donation_id: Option<DonationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<bool>,
}

impl WebhookOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), donation_id: None, processed: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), donation_id: None, processed: None }
    }

    pub fn with_donation_id(mut self, id: DonationId) -> Self {
        self.donation_id = Some(id);
        self
    }

    pub fn with_processed(mut self, processed: bool) -> Self {
        self.processed = Some(processed);
        self
    }
}
