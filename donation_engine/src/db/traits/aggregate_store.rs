use crate::{
    db::traits::LedgerError,
    db_types::{Program, ProgramId, PropagationTicket, ReferralCode, ReferralCodeId},
};

/// Derived funding totals for programs and referral codes.
#[allow(async_fn_in_trait)]
pub trait AggregateStore: Clone {
    /// Applies the ticket's delta to its program and referral code in a single transaction.
    ///
    /// The ticket is claimed first. If it was already applied, nothing happens and `false` is returned. Counters are
    /// adjusted in place and never drop below zero. A credit also stamps the referral code's `last_used` time.
    ///
    /// If any part fails, the whole application is rolled back and the ticket stays pending.
    async fn apply_propagation(&self, ticket: &PropagationTicket) -> Result<bool, LedgerError>;

    /// Fetches up to `limit` journal entries that have not been applied yet, oldest first.
    async fn fetch_pending_propagations(&self, limit: i64) -> Result<Vec<PropagationTicket>, LedgerError>;

    async fn fetch_program(&self, id: &ProgramId) -> Result<Option<Program>, LedgerError>;

    async fn fetch_referral_code(&self, id: &ReferralCodeId) -> Result<Option<ReferralCode>, LedgerError>;

    /// Rebuilds a program's totals from its successful donations, discounting journal entries that are still pending.
    async fn recompute_program_totals(&self, id: &ProgramId) -> Result<Program, LedgerError>;

    /// Rebuilds a referral code's totals from its successful donations, discounting journal entries that are still
    /// pending.
    async fn recompute_referral_totals(&self, id: &ReferralCodeId) -> Result<ReferralCode, LedgerError>;
}
