use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::AggregateStore,
    db_types::{Program, ProgramId, PropagationTicket, ReferralCode, ReferralCodeId},
    donation_api::errors::ReconciliationError,
};

/// Applies funding deltas from committed transitions to program and referral code totals.
///
/// Every delta arrives as a [`PropagationTicket`] that the transition guard wrote in the same transaction as the
/// status change. The propagator never decides *whether* a delta should be applied; it only applies what it is given.
/// The ticket claim in [`AggregateStore::apply_propagation`] makes a second application of the same ticket a no-op, so
/// the repair worker can replay pending tickets after a crash without double counting.
#[derive(Clone)]
pub struct AggregatePropagator<B> {
    db: B,
}

impl<B> Debug for AggregatePropagator<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AggregatePropagator")
    }
}

/// What a replay pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub already_applied: usize,
    pub failed: usize,
}

impl ReplaySummary {
    pub fn total(&self) -> usize {
        self.applied + self.already_applied + self.failed
    }
}

impl<B> AggregatePropagator<B>
where B: AggregateStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Applies the ticket's delta. Returns `false` if the ticket had already been applied.
    pub async fn apply(&self, ticket: &PropagationTicket) -> Result<bool, ReconciliationError> {
        trace!("🔄️ Applying journal entry #{}: {}", ticket.id, ticket.delta);
        let applied = self.db.apply_propagation(ticket).await?;
        if applied {
            debug!("🔄️ Journal entry #{} ({} for donation {}) applied: {}", ticket.id, ticket.kind, ticket.donation_id, ticket.delta);
        } else {
            debug!("🔄️ Journal entry #{} was already applied. Nothing to do", ticket.id);
        }
        Ok(applied)
    }

    /// Applies up to `batch_size` pending journal entries, oldest first. Failures are logged and counted, and the
    /// entries stay pending for the next pass.
    pub async fn replay_pending(&self, batch_size: i64) -> Result<ReplaySummary, ReconciliationError> {
        let pending = self.db.fetch_pending_propagations(batch_size).await?;
        let mut summary = ReplaySummary::default();
        for ticket in &pending {
            match self.apply(ticket).await {
                Ok(true) => summary.applied += 1,
                Ok(false) => summary.already_applied += 1,
                Err(e) => {
                    error!("🔄️ Journal entry #{} for donation {} could not be applied. {e}", ticket.id, ticket.donation_id);
                    summary.failed += 1;
                },
            }
        }
        if summary.total() > 0 {
            info!(
                "🔄️ Replayed {} pending journal entries: {} applied, {} already applied, {} failed",
                summary.total(),
                summary.applied,
                summary.already_applied,
                summary.failed
            );
        }
        Ok(summary)
    }

    pub async fn fetch_program(&self, id: &ProgramId) -> Result<Option<Program>, ReconciliationError> {
        Ok(self.db.fetch_program(id).await?)
    }

    pub async fn fetch_referral_code(&self, id: &ReferralCodeId) -> Result<Option<ReferralCode>, ReconciliationError> {
        Ok(self.db.fetch_referral_code(id).await?)
    }

    /// Rebuilds a program's totals from the ledger. Use this to repair drift caused by out-of-band edits.
    pub async fn recompute_program(&self, id: &ProgramId) -> Result<Program, ReconciliationError> {
        let before = self.db.fetch_program(id).await?;
        let after = self.db.recompute_program_totals(id).await?;
        if let Some(before) = before {
            if before.raised_amount != after.raised_amount || before.donation_count != after.donation_count {
                warn!(
                    "🔄️ Program {id} had drifted. Raised {} -> {}, count {} -> {}",
                    before.raised_amount, after.raised_amount, before.donation_count, after.donation_count
                );
            }
        }
        Ok(after)
    }

    pub async fn recompute_referral_code(&self, id: &ReferralCodeId) -> Result<ReferralCode, ReconciliationError> {
        let before = self.db.fetch_referral_code(id).await?;
        let after = self.db.recompute_referral_totals(id).await?;
        if let Some(before) = before {
            if before.total_amount != after.total_amount || before.total_donations != after.total_donations {
                warn!(
                    "🔄️ Referral code {id} had drifted. Amount {} -> {}, count {} -> {}",
                    before.total_amount, after.total_amount, before.total_donations, after.total_donations
                );
            }
        }
        Ok(after)
    }
}
