//! Binds the Razorpay REST client to the engine's [`PaymentGatewayClient`] seam.
use donation_engine::{
    db_types::{MinorUnits, OrderId, PaymentId},
    GatewayError,
    GatewayOrder,
    GatewayPayment,
    PaymentGatewayClient,
};
use log::*;
use razorpay_tools::{NewRazorpayOrder, RazorpayApi, RazorpayApiError, RazorpayOrder, RazorpayPayment};

#[derive(Clone)]
pub struct RazorpayGateway {
    api: RazorpayApi,
}

impl RazorpayGateway {
    pub fn new(api: RazorpayApi) -> Self {
        Self { api }
    }

    pub fn key_id(&self) -> &str {
        self.api.key_id()
    }
}

impl PaymentGatewayClient for RazorpayGateway {
    async fn create_order(&self, amount: MinorUnits, currency: &str, receipt: &str) -> Result<GatewayOrder, GatewayError> {
        let order = self.api.create_order(NewRazorpayOrder::new(amount, currency, receipt)).await.map_err(|e| {
            warn!("💻️ Razorpay could not create an order for receipt {receipt}. {e}");
            gateway_error(e)
        })?;
        Ok(gateway_order(order))
    }

    async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<GatewayPayment, GatewayError> {
        let payment = self.api.fetch_payment(payment_id.as_str()).await.map_err(gateway_error)?;
        Ok(gateway_payment(payment))
    }
}

pub fn gateway_order(order: RazorpayOrder) -> GatewayOrder {
    GatewayOrder {
        id: OrderId::from(order.id.as_str()),
        amount: order.amount,
        currency: order.currency,
        receipt: order.receipt,
        status: order.status,
    }
}

pub fn gateway_payment(payment: RazorpayPayment) -> GatewayPayment {
    GatewayPayment {
        id: PaymentId::from(payment.id.as_str()),
        order_id: payment.order_id.as_deref().map(OrderId::from),
        amount: payment.amount,
        currency: payment.currency,
        status: payment.status,
        method: payment.method,
    }
}

pub fn gateway_error(e: RazorpayApiError) -> GatewayError {
    match e {
        RazorpayApiError::QueryError { .. } => GatewayError::Rejected(e.to_string()),
        RazorpayApiError::JsonError(s) => GatewayError::InvalidResponse(s),
        e => GatewayError::RequestFailed(e.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn convert_payment() {
        let payment = RazorpayPayment {
            id: "pay_G8VQzjPLoAvm6D".into(),
            amount: MinorUnits::from(100),
            currency: "INR".into(),
            status: "captured".into(),
            order_id: Some("order_G8VPOayFxWEU28".into()),
            method: Some("upi".into()),
            captured: true,
            email: None,
            contact: None,
            error_code: None,
            error_description: None,
            created_at: 1_606_985_209,
        };
        let payment = gateway_payment(payment);
        assert_eq!(payment.id.as_str(), "pay_G8VQzjPLoAvm6D");
        assert_eq!(payment.order_id, Some(OrderId::from("order_G8VPOayFxWEU28")));
        assert_eq!(payment.status, "captured");
    }

    #[test]
    fn convert_errors() {
        let e = RazorpayApiError::QueryError {
            status: 400,
            code: "BAD_REQUEST_ERROR".into(),
            description: "The amount must be at least INR 1.00".into(),
        };
        assert!(matches!(gateway_error(e), GatewayError::Rejected(_)));
        let e = RazorpayApiError::RestResponseError("connection refused".into());
        assert!(matches!(gateway_error(e), GatewayError::RequestFailed(_)));
    }
}
