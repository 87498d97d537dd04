use std::fmt::Debug;

use dpg_common::{helpers::is_record_id, Secret};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db::traits::{AggregateStore, DonationLedger},
    db_types::{Donation, DonationId, DonationLookup, DonationStatus, MinorUnits, OrderId, PaymentId},
    donation_api::{
        errors::ReconciliationError,
        transition_guard::{CandidateTransition, TransitionEvidence, TransitionGuard},
    },
    gateway::PaymentGatewayClient,
    helpers::verify_payment_signature,
};

/// The checkout widget's payment confirmation, as relayed by the donor's browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerificationRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub donation_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerificationResult {
    pub success: bool,
    pub payment_id: PaymentId,
    pub amount: MinorUnits,
    pub currency: String,
    /// The gateway's view of the payment (e.g. `captured`), or the donation status if the gateway could not be
    /// reached.
    pub status: String,
}

/// Handles the donor's browser confirming a payment.
#[derive(Clone)]
pub struct VerificationApi<B, G> {
    guard: TransitionGuard<B>,
    gateway: G,
    key_secret: Secret<String>,
}

impl<B, G> Debug for VerificationApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerificationApi")
    }
}

impl<B, G> VerificationApi<B, G>
where
    B: DonationLedger + AggregateStore,
    G: PaymentGatewayClient,
{
    pub fn new(guard: TransitionGuard<B>, gateway: G, key_secret: Secret<String>) -> Self {
        Self { guard, gateway, key_secret }
    }

    /// Verifies the payment signature and reconciles the donation.
    ///
    /// * A donation that already succeeded is reported as successful straight away.
    /// * A bad signature marks a pending donation `FAILED` and returns [`ReconciliationError::InvalidSignature`].
    /// * A good signature submits a `SUCCESS` candidate backed by the donation's own amount. If the donation does not
    ///   end up `SUCCESS` (e.g. it had already failed), [`ReconciliationError::DonationNotSuccessful`] is returned.
    pub async fn verify_payment(
        &self,
        request: PaymentVerificationRequest,
    ) -> Result<PaymentVerificationResult, ReconciliationError> {
        validate_request(&request)?;
        let donation_id = DonationId::from(request.donation_id.as_str());
        let order_id = OrderId::from(request.order_id.as_str());
        let payment_id = PaymentId::from(request.payment_id.as_str());
        let lookup = DonationLookup::ById(donation_id.clone());
        let donation = self
            .guard
            .db()
            .fetch_donation(&lookup)
            .await?
            .ok_or_else(|| ReconciliationError::DonationNotFound(lookup.clone()))?;
        if donation.gateway_order_id != order_id {
            warn!("🔄️ Verification for donation {donation_id} named order {order_id}, but it is bound to {}", donation.gateway_order_id);
            return Err(ReconciliationError::OrderMismatch { expected: donation.gateway_order_id, received: order_id });
        }
        if donation.status == DonationStatus::Success && donation.gateway_payment_id.is_some() {
            debug!("🔄️ Donation {donation_id} has already been verified");
            return Ok(self.success_result(donation).await);
        }
        let evidence = TransitionEvidence::default().with_order_id(order_id.clone());
        if !verify_payment_signature(order_id.as_str(), payment_id.as_str(), &request.signature, self.key_secret.as_bytes()) {
            warn!("🔐️ Invalid payment signature for donation {donation_id} ({order_id}/{payment_id})");
            // The payment id is unverified, so it is never recorded against the donation
            let candidate = CandidateTransition::failure(lookup, evidence.with_reason("invalid signature"));
            match self.guard.submit(candidate).await {
                Ok(outcome) => debug!("🔄️ {outcome}"),
                Err(e) => warn!("🔄️ Could not record the failed verification for donation {donation_id}. {e}"),
            }
            return Err(ReconciliationError::InvalidSignature);
        }
        let evidence = evidence.with_payment_id(payment_id).with_amount(donation.amount).with_currency(&donation.currency);
        let outcome = self.guard.submit(CandidateTransition::success(lookup, evidence)).await?;
        debug!("🔄️ {outcome}");
        let donation = outcome.into_donation();
        if donation.status == DonationStatus::Success {
            Ok(self.success_result(donation).await)
        } else {
            Err(ReconciliationError::DonationNotSuccessful { status: donation.status })
        }
    }

    async fn success_result(&self, donation: Donation) -> PaymentVerificationResult {
        let payment_id = donation.gateway_payment_id.clone().unwrap_or_else(|| PaymentId::from(""));
        let status = match self.gateway.fetch_payment(&payment_id).await {
            Ok(payment) => payment.status,
            Err(e) => {
                warn!("🔄️ Could not fetch payment {payment_id} from the gateway. Reporting the donation status. {e}");
                donation.status.to_string()
            },
        };
        PaymentVerificationResult { success: true, payment_id, amount: donation.amount, currency: donation.currency, status }
    }
}

fn validate_request(request: &PaymentVerificationRequest) -> Result<(), ReconciliationError> {
    let missing = [
        ("orderId", &request.order_id),
        ("paymentId", &request.payment_id),
        ("signature", &request.signature),
        ("donationId", &request.donation_id),
    ]
    .into_iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(k, _)| k)
    .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(ReconciliationError::InvalidRequest(format!("Missing required fields: {}", missing.join(", "))));
    }
    if !is_record_id(&request.donation_id) {
        return Err(ReconciliationError::InvalidRequest(format!("'{}' is not a valid donation id", request.donation_id)));
    }
    Ok(())
}
