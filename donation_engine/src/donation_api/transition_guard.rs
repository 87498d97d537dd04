//! # The state transition guard
//!
//! Every status change a donation ever goes through passes through [`TransitionGuard::submit`]. The client
//! verification call and the gateway webhook may deliver the same outcome for the same payment in either order, or at
//! the same time, possibly from different processes. The guard makes sure only the first has any effect.
//!
//! For each candidate transition the guard
//! 1. loads the donation by internal id, gateway order id or gateway payment id,
//! 2. rejects evidence carrying a different gateway order id,
//! 3. resolves a repeat of an already-applied outcome as a [`TransitionOutcome::Duplicate`],
//! 4. downgrades a `SUCCESS` whose amount or currency disagrees with the donation to `FAILED`,
//! 5. resolves anything the status machine does not allow as a [`TransitionOutcome::Ignored`] no-op,
//! 6. writes the new status with a conditional update keyed on the status it observed in step 1.
//!
//! If the conditional write finds that another writer got there first, the guard reloads the donation and evaluates the
//! candidate again. The second evaluation sees the winner's status and normally ends in step 3 or 5.
//!
//! A committed transition that moves funds carries a journal ticket, which is handed to the
//! [`AggregatePropagator`]. A propagation failure is logged as a reconciliation defect, but the transition is still
//! reported as applied: the payment outcome is real, and the repair worker will apply the ticket later.
use std::fmt::{Debug, Display};

use log::*;

use crate::{
    db::traits::{AggregateStore, DonationLedger},
    db_types::{CommittedTransition, Donation, DonationLookup, DonationStatus, MinorUnits, OrderId, PaymentId, StatusChange},
    donation_api::{aggregate_propagator::AggregatePropagator, errors::ReconciliationError},
    events::{EventProducers, EventType},
};

/// How many times a candidate is re-evaluated after losing a conditional write before giving up.
const MAX_ATTEMPTS: usize = 5;

/// What a reconciliation signal claims about a payment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionEvidence {
    /// Cross-checked against the donation's bound gateway order id when present.
    pub order_id: Option<OrderId>,
    pub payment_id: Option<PaymentId>,
    /// Cross-checked against the donation's amount for `SUCCESS` candidates when present.
    pub amount: Option<MinorUnits>,
    pub currency: Option<String>,
    /// Recorded as the failure reason on `FAILED` transitions.
    pub reason: Option<String>,
}

impl TransitionEvidence {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_payment_id(mut self, payment_id: PaymentId) -> Self {
        self.payment_id = Some(payment_id);
        self
    }

    pub fn with_amount(mut self, amount: MinorUnits) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = Some(currency.to_string());
        self
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTransition {
    pub lookup: DonationLookup,
    pub target: DonationStatus,
    pub evidence: TransitionEvidence,
}

impl CandidateTransition {
    pub fn new(lookup: DonationLookup, target: DonationStatus, evidence: TransitionEvidence) -> Self {
        Self { lookup, target, evidence }
    }

    pub fn success(lookup: DonationLookup, evidence: TransitionEvidence) -> Self {
        Self::new(lookup, DonationStatus::Success, evidence)
    }

    pub fn failure(lookup: DonationLookup, evidence: TransitionEvidence) -> Self {
        Self::new(lookup, DonationStatus::Failed, evidence)
    }

    pub fn refund(lookup: DonationLookup, evidence: TransitionEvidence) -> Self {
        Self::new(lookup, DonationStatus::Refunded, evidence)
    }
}

impl Display for CandidateTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} for {}", self.target, self.lookup)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was committed. `propagated` is false if the aggregate update failed and is pending repair.
    Applied { donation: Donation, propagated: bool },
    /// The donation already reflects this evidence. Nothing was changed.
    Duplicate { donation: Donation },
    /// The status machine does not allow this transition. Nothing was changed.
    Ignored { donation: Donation, reason: String },
    /// The evidence disagreed with the donation's amount or currency, and the donation was marked `FAILED`.
    AmountMismatch { donation: Donation },
}

impl TransitionOutcome {
    /// The donation as it stands after the outcome.
    pub fn donation(&self) -> &Donation {
        match self {
            TransitionOutcome::Applied { donation, .. } => donation,
            TransitionOutcome::Duplicate { donation } => donation,
            TransitionOutcome::Ignored { donation, .. } => donation,
            TransitionOutcome::AmountMismatch { donation } => donation,
        }
    }

    pub fn into_donation(self) -> Donation {
        match self {
            TransitionOutcome::Applied { donation, .. } => donation,
            TransitionOutcome::Duplicate { donation } => donation,
            TransitionOutcome::Ignored { donation, .. } => donation,
            TransitionOutcome::AmountMismatch { donation } => donation,
        }
    }

    /// True if this call changed the donation.
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. } | TransitionOutcome::AmountMismatch { .. })
    }
}

impl Display for TransitionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionOutcome::Applied { donation, propagated: true } => {
                write!(f, "Donation {} is now {}", donation.id, donation.status)
            },
            TransitionOutcome::Applied { donation, propagated: false } => {
                write!(f, "Donation {} is now {}. Aggregate update is pending", donation.id, donation.status)
            },
            TransitionOutcome::Duplicate { donation } => {
                write!(f, "Donation {} is already {}", donation.id, donation.status)
            },
            TransitionOutcome::Ignored { donation, reason } => write!(f, "Donation {} unchanged. {reason}", donation.id),
            TransitionOutcome::AmountMismatch { donation } => write!(
                f,
                "Donation {} marked FAILED. {}",
                donation.id,
                donation.failure_reason.as_deref().unwrap_or("payment details did not match")
            ),
        }
    }
}

enum Decision {
    Settled(TransitionOutcome),
    Write { change: StatusChange, mismatch: bool },
}

#[derive(Clone)]
pub struct TransitionGuard<B> {
    db: B,
    propagator: AggregatePropagator<B>,
    producers: EventProducers,
}

impl<B> Debug for TransitionGuard<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransitionGuard")
    }
}

impl<B> TransitionGuard<B>
where B: DonationLedger + AggregateStore
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        let propagator = AggregatePropagator::new(db.clone());
        Self { db, propagator, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn propagator(&self) -> &AggregatePropagator<B> {
        &self.propagator
    }

    /// Evaluates `candidate` against the current state of its donation and applies it if it is legal and new.
    ///
    /// Only `DonationNotFound`, `OrderMismatch` and storage failures are errors. Duplicates and illegal transitions are
    /// successful no-ops, so callers can always retry safely.
    pub async fn submit(&self, candidate: CandidateTransition) -> Result<TransitionOutcome, ReconciliationError> {
        trace!("🔄️ Evaluating candidate transition to {candidate}");
        for attempt in 1..=MAX_ATTEMPTS {
            let donation = self
                .db
                .fetch_donation(&candidate.lookup)
                .await?
                .ok_or_else(|| ReconciliationError::DonationNotFound(candidate.lookup.clone()))?;
            let (change, mismatch) = match evaluate(donation, &candidate)? {
                Decision::Settled(outcome) => return Ok(outcome),
                Decision::Write { change, mismatch } => (change, mismatch),
            };
            let donation_id = change.donation_id.clone();
            match self.db.transition_status(change).await? {
                Some(committed) => return Ok(self.on_committed(committed, mismatch).await),
                None => {
                    debug!("🔄️ Donation {donation_id} changed underneath us (attempt {attempt}). Re-evaluating {candidate}");
                },
            }
        }
        error!("🔄️ Gave up on {candidate} after {MAX_ATTEMPTS} conflicting writes");
        Err(ReconciliationError::DatabaseError(format!(
            "Could not apply {candidate} after {MAX_ATTEMPTS} attempts due to concurrent updates"
        )))
    }

    async fn on_committed(&self, committed: CommittedTransition, mismatch: bool) -> TransitionOutcome {
        let CommittedTransition { donation, ticket } = committed;
        info!("🔄️ {donation}");
        let propagated = match ticket {
            Some(ticket) => match self.propagator.apply(&ticket).await {
                Ok(_) => true,
                Err(e) => {
                    error!(
                        "🔄️ Aggregate propagation failure for donation {}. The donation is {}, but journal entry #{} \
                         ({}) could not be applied and is left for repair. {e}",
                        donation.id, donation.status, ticket.id, ticket.delta
                    );
                    false
                },
            },
            None => true,
        };
        if let Some(event) = EventType::for_transition(donation.clone(), propagated) {
            self.producers.publish(event).await;
        }
        if mismatch {
            TransitionOutcome::AmountMismatch { donation }
        } else {
            TransitionOutcome::Applied { donation, propagated }
        }
    }
}

fn evaluate(donation: Donation, candidate: &CandidateTransition) -> Result<Decision, ReconciliationError> {
    let evidence = &candidate.evidence;
    if let Some(order_id) = &evidence.order_id {
        if order_id != &donation.gateway_order_id {
            warn!("🔄️ Evidence for order {order_id} was presented for donation {}, which is bound to {}", donation.id, donation.gateway_order_id);
            return Err(ReconciliationError::OrderMismatch {
                expected: donation.gateway_order_id.clone(),
                received: order_id.clone(),
            });
        }
    }
    if is_duplicate(&donation, candidate.target, evidence) {
        debug!("🔄️ Donation {} is already {}. Ignoring repeat signal", donation.id, donation.status);
        return Ok(Decision::Settled(TransitionOutcome::Duplicate { donation }));
    }
    let mut target = candidate.target;
    let mut reason = evidence.reason.clone();
    let mut mismatch = false;
    if target == DonationStatus::Success {
        if let Some(discrepancy) = discrepancy(&donation, evidence) {
            warn!("🔄️ Donation {}: {discrepancy}. Marking it as FAILED instead of SUCCESS", donation.id);
            target = DonationStatus::Failed;
            reason = Some(discrepancy);
            mismatch = true;
        }
    }
    if !donation.status.can_transition_to(target) {
        let reason = format!("{} -> {target} is not a permitted transition", donation.status);
        if target == DonationStatus::Success && donation.status == DonationStatus::Success {
            warn!(
                "🔄️ Donation {} already succeeded with payment {}, but a second payment {} was reported for it",
                donation.id,
                donation.gateway_payment_id.as_ref().map(|p| p.as_str()).unwrap_or("none"),
                evidence.payment_id.as_ref().map(|p| p.as_str()).unwrap_or("none")
            );
        } else {
            info!("🔄️ Donation {}: {reason}. Ignoring signal", donation.id);
        }
        return Ok(Decision::Settled(TransitionOutcome::Ignored { donation, reason }));
    }
    let change = StatusChange {
        donation_id: donation.id.clone(),
        from: donation.status,
        to: target,
        payment_id: evidence.payment_id.clone(),
        reason: if target == DonationStatus::Failed { reason } else { None },
    };
    Ok(Decision::Write { change, mismatch })
}

/// A repeat of a signal that has already been applied. For `SUCCESS` the payment id must match too, since a different
/// payment for the same order is a different fact.
fn is_duplicate(donation: &Donation, target: DonationStatus, evidence: &TransitionEvidence) -> bool {
    if donation.status != target {
        return false;
    }
    match (target, &evidence.payment_id) {
        (DonationStatus::Success, Some(payment_id)) => donation.succeeded_with(payment_id),
        _ => true,
    }
}

fn discrepancy(donation: &Donation, evidence: &TransitionEvidence) -> Option<String> {
    if let Some(amount) = evidence.amount {
        if amount != donation.amount {
            return Some(format!(
                "amount mismatch: expected {} {}, gateway reported {amount}",
                donation.amount, donation.currency
            ));
        }
    }
    match &evidence.currency {
        Some(currency) if !currency.eq_ignore_ascii_case(&donation.currency) => {
            Some(format!("currency mismatch: expected {}, gateway reported {currency}", donation.currency))
        },
        _ => None,
    }
}
