use donation_engine::{
    db_types::{DonationId, MinorUnits, OrderId},
    DonationOrder,
};
use serde::{Deserialize, Serialize};

/// Everything the checkout widget needs to open a payment for a new donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationOrderResponse {
    pub donation_id: DonationId,
    pub order_id: OrderId,
    pub amount: MinorUnits,
    pub currency: String,
    pub key_id: String,
}

impl DonationOrderResponse {
    pub fn new(order: DonationOrder, key_id: &str) -> Self {
        Self {
            donation_id: order.donation.id,
            order_id: order.order.id,
            amount: order.order.amount,
            currency: order.order.currency,
            key_id: key_id.to_string(),
        }
    }
}

/// The public gateway key id handed to the checkout widget.
#[derive(Debug, Clone, Default)]
pub struct CheckoutKey(pub String);
