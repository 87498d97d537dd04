//! The slice of the payment gateway's API that the engine depends on.
//!
//! The engine never constructs a gateway client itself. Callers inject one, which keeps the reconciliation flows
//! testable without a network connection. The Razorpay implementation lives in the server crate.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{MinorUnits, OrderId, PaymentId};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not reach the payment gateway. {0}")]
    RequestFailed(String),
    #[error("The payment gateway rejected the request. {0}")]
    Rejected(String),
    #[error("The payment gateway sent a response we could not understand. {0}")]
    InvalidResponse(String),
}

/// An order as created by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: OrderId,
    pub amount: MinorUnits,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

/// A payment as the gateway currently sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: PaymentId,
    pub order_id: Option<OrderId>,
    pub amount: MinorUnits,
    pub currency: String,
    /// The gateway's own status string, e.g. `captured`, `authorized` or `failed`.
    pub status: String,
    pub method: Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait PaymentGatewayClient: Clone {
    /// Creates an order for `amount` in `currency`. `receipt` is echoed back by the gateway and carries our donation
    /// id.
    async fn create_order(&self, amount: MinorUnits, currency: &str, receipt: &str) -> Result<GatewayOrder, GatewayError>;

    async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<GatewayPayment, GatewayError>;
}
