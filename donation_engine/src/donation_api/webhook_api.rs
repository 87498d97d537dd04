use std::fmt::Debug;

use dpg_common::Secret;
use log::*;

use crate::{
    db::traits::{AggregateStore, DonationLedger},
    db_types::{DonationLookup, OrderId},
    donation_api::{
        errors::ReconciliationError,
        transition_guard::{CandidateTransition, TransitionEvidence, TransitionGuard, TransitionOutcome},
        webhook_objects::{PaymentEntity, WebhookEnvelope, WebhookEventKind, WebhookOutcome},
    },
    helpers::verify_webhook_signature,
};

/// Authenticates and handles gateway webhook events.
///
/// Once a webhook is known to be authentic, business outcomes (donation not found, order or amount mismatches,
/// repeated or out-of-order events) are reported in the returned [`WebhookOutcome`] rather than as errors. The gateway
/// retries anything that is not a 2xx, and none of these would turn out differently on a retry.
///
/// Errors are reserved for requests that can never be processed (bad signature, malformed envelope) and for storage
/// failures, which may well succeed on a retry.
#[derive(Clone)]
pub struct WebhookApi<B> {
    guard: TransitionGuard<B>,
    webhook_secret: Secret<String>,
}

impl<B> Debug for WebhookApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookApi")
    }
}

impl<B> WebhookApi<B>
where B: DonationLedger + AggregateStore
{
    pub fn new(guard: TransitionGuard<B>, webhook_secret: Secret<String>) -> Self {
        Self { guard, webhook_secret }
    }

    /// Checks the signature header against the raw body. No donation is looked at before this succeeds.
    ///
    /// Every call is rejected while no webhook secret is configured.
    pub fn authenticate(&self, raw_body: &[u8], signature: Option<&str>) -> Result<(), ReconciliationError> {
        let signature = signature.ok_or_else(|| {
            warn!("🪝️ Webhook call without a signature header. Rejecting it");
            ReconciliationError::MissingWebhookSignature
        })?;
        if self.webhook_secret.is_empty() {
            warn!("🪝️ No webhook secret is configured. Rejecting webhook call");
            return Err(ReconciliationError::InvalidWebhookSignature);
        }
        if verify_webhook_signature(raw_body, signature, self.webhook_secret.as_bytes()) {
            trace!("🪝️ Webhook signature check ✅️");
            Ok(())
        } else {
            warn!("🪝️ Webhook signature did not verify. Rejecting it");
            Err(ReconciliationError::InvalidWebhookSignature)
        }
    }

    /// Authenticates and then processes a webhook call.
    pub async fn handle(&self, raw_body: &[u8], signature: Option<&str>) -> Result<WebhookOutcome, ReconciliationError> {
        self.authenticate(raw_body, signature)?;
        self.process_event(raw_body).await
    }

    /// Parses and dispatches an event whose signature has already been verified.
    async fn process_event(&self, raw_body: &[u8]) -> Result<WebhookOutcome, ReconciliationError> {
        let envelope = serde_json::from_slice::<WebhookEnvelope>(raw_body).map_err(|e| {
            warn!("🪝️ Could not parse webhook envelope. {e}");
            ReconciliationError::InvalidRequest(format!("Malformed webhook envelope. {e}"))
        })?;
        let kind = envelope.kind();
        info!("🪝️ Received {kind} webhook event");
        match kind {
            WebhookEventKind::PaymentCaptured | WebhookEventKind::OrderPaid => self.on_payment_captured(&envelope).await,
            WebhookEventKind::PaymentFailed => self.on_payment_failed(&envelope).await,
            WebhookEventKind::PaymentAuthorized => self.on_payment_authorized(&envelope).await,
            WebhookEventKind::RefundCreated | WebhookEventKind::RefundProcessed => self.on_refund(&envelope).await,
            WebhookEventKind::Other(event) => {
                debug!("🪝️ Event type {event} is not handled. Acknowledging it");
                Ok(WebhookOutcome::success(format!("Unhandled event type: {event}")).with_processed(false))
            },
        }
    }

    async fn on_payment_captured(&self, envelope: &WebhookEnvelope) -> Result<WebhookOutcome, ReconciliationError> {
        let candidate = match envelope.payment() {
            Some(payment) => {
                let order_id = payment_order_id(envelope, payment)?;
                let evidence = TransitionEvidence::default()
                    .with_order_id(order_id.clone())
                    .with_payment_id(payment.id.clone())
                    .with_amount(payment.amount)
                    .with_currency(&payment.currency);
                CandidateTransition::success(DonationLookup::ByOrderId(order_id), evidence)
            },
            // order.paid always carries the payment in practice, but the order entity is enough to settle it
            None => {
                let order = envelope.order().ok_or_else(|| missing_entity(envelope, "payment"))?;
                let evidence = TransitionEvidence::default()
                    .with_order_id(order.id.clone())
                    .with_amount(order.amount_paid.unwrap_or(order.amount))
                    .with_currency(&order.currency);
                CandidateTransition::success(DonationLookup::ByOrderId(order.id.clone()), evidence)
            },
        };
        self.submit(candidate).await
    }

    async fn on_payment_failed(&self, envelope: &WebhookEnvelope) -> Result<WebhookOutcome, ReconciliationError> {
        let payment = envelope.payment().ok_or_else(|| missing_entity(envelope, "payment"))?;
        let order_id = payment_order_id(envelope, payment)?;
        let reason = payment.failure_reason();
        let evidence = TransitionEvidence::default()
            .with_order_id(order_id.clone())
            .with_payment_id(payment.id.clone())
            .with_reason(&reason);
        self.submit(CandidateTransition::failure(DonationLookup::ByOrderId(order_id), evidence)).await
    }

    async fn on_payment_authorized(&self, envelope: &WebhookEnvelope) -> Result<WebhookOutcome, ReconciliationError> {
        let payment = envelope.payment().ok_or_else(|| missing_entity(envelope, "payment"))?;
        let order_id = payment_order_id(envelope, payment)?;
        match self.guard.db().record_authorized_payment(&order_id, &payment.id).await? {
            Some(donation) => {
                debug!("🪝️ Payment {} authorized for donation {}", payment.id, donation.id);
                Ok(WebhookOutcome::success(format!("Payment {} authorized", payment.id))
                    .with_donation_id(donation.id)
                    .with_processed(true))
            },
            None => {
                warn!("🪝️ Payment {} was authorized for order {order_id}, but no donation is bound to it", payment.id);
                Ok(WebhookOutcome::failure(format!("No donation found for order id {order_id}")).with_processed(false))
            },
        }
    }

    async fn on_refund(&self, envelope: &WebhookEnvelope) -> Result<WebhookOutcome, ReconciliationError> {
        let payment_id = envelope
            .refund()
            .map(|r| r.payment_id.clone())
            .or_else(|| envelope.payment().map(|p| p.id.clone()))
            .ok_or_else(|| missing_entity(envelope, "refund"))?;
        let mut evidence = TransitionEvidence::default().with_payment_id(payment_id.clone());
        if let Some(refund) = envelope.refund() {
            debug!("🪝️ Refund {} of {} against payment {payment_id}", refund.id, refund.amount);
            evidence = evidence.with_reason(&format!("refund {}", refund.id));
        }
        let lookup = DonationLookup::ByPaymentId(payment_id);
        if let (Some(refund), Ok(Some(donation))) = (envelope.refund(), self.guard.db().fetch_donation(&lookup).await) {
            if refund.amount < donation.amount {
                warn!(
                    "🪝️ Refund {} covers {} of the {} donated in {}. Refunds reverse the full donation",
                    refund.id, refund.amount, donation.amount, donation.id
                );
            }
        }
        self.submit(CandidateTransition::refund(lookup, evidence)).await
    }

    async fn submit(&self, candidate: CandidateTransition) -> Result<WebhookOutcome, ReconciliationError> {
        match self.guard.submit(candidate).await {
            Ok(outcome) => Ok(outcome_for(outcome)),
            Err(e @ (ReconciliationError::DonationNotFound(_) | ReconciliationError::OrderMismatch { .. })) => {
                warn!("🪝️ {e}");
                Ok(WebhookOutcome::failure(e.to_string()).with_processed(false))
            },
            Err(e) => {
                error!("🪝️ Could not process webhook event. {e}");
                Err(e)
            },
        }
    }
}

fn outcome_for(outcome: TransitionOutcome) -> WebhookOutcome {
    let message = outcome.to_string();
    match outcome {
        TransitionOutcome::Applied { donation, .. } => {
            WebhookOutcome::success(message).with_donation_id(donation.id).with_processed(true)
        },
        TransitionOutcome::Duplicate { donation } | TransitionOutcome::Ignored { donation, .. } => {
            WebhookOutcome::success(message).with_donation_id(donation.id).with_processed(false)
        },
        TransitionOutcome::AmountMismatch { donation } => {
            WebhookOutcome::failure(message).with_donation_id(donation.id).with_processed(true)
        },
    }
}

fn payment_order_id(envelope: &WebhookEnvelope, payment: &PaymentEntity) -> Result<OrderId, ReconciliationError> {
    payment.order_id.clone().or_else(|| envelope.order().map(|o| o.id.clone())).ok_or_else(|| {
        ReconciliationError::InvalidRequest(format!("Payment {} in {} event has no order id", payment.id, envelope.event))
    })
}

fn missing_entity(envelope: &WebhookEnvelope, entity: &str) -> ReconciliationError {
    warn!("🪝️ {} event is missing its {entity} entity", envelope.event);
    ReconciliationError::InvalidRequest(format!("{} event has no {entity} entity", envelope.event))
}
