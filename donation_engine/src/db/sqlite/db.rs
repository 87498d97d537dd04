use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{db_url, donations, journal, new_pool, programs, referral_codes, SqliteDatabaseError};
use crate::{
    db::traits::{AggregateStore, DonationLedger, LedgerError, ReferralManagement},
    db_types::{
        AggregateDelta,
        CommittedTransition,
        Donation,
        DonationStatus,
        DonationLookup,
        NewDonation,
        NewProgram,
        NewReferralCode,
        OrderId,
        PaymentId,
        Program,
        ProgramId,
        PropagationTicket,
        ReferralCode,
        ReferralCodeId,
        ResolvedReferral,
        StatusChange,
        TransitionKind,
    },
};

const DEFAULT_MAX_CONNECTIONS: u32 = 25;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `DPG_DATABASE_URL`.
    pub async fn new() -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. This is safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), SqliteDatabaseError> {
        self.pool.close().await;
        Ok(())
    }

    pub async fn insert_program(&self, program: NewProgram) -> Result<Program, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let program = programs::insert_program(program, &mut tx).await?;
        tx.commit().await?;
        Ok(program)
    }

    pub async fn insert_referral_code(&self, code: NewReferralCode) -> Result<ReferralCode, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let code = referral_codes::insert_referral_code(code, &mut tx).await?;
        tx.commit().await?;
        Ok(code)
    }
}

impl DonationLedger for SqliteDatabase {
    async fn insert_donation(&self, donation: NewDonation) -> Result<Donation, LedgerError> {
        // The binding has to be committed and visible to every pooled connection before the order is handed out
        let mut tx = self.pool.begin().await?;
        let donation = donations::insert_donation(donation, &mut tx).await?;
        tx.commit().await?;
        Ok(donation)
    }

    async fn fetch_donation(&self, lookup: &DonationLookup) -> Result<Option<Donation>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let donation = donations::fetch_donation(lookup, &mut conn).await?;
        Ok(donation)
    }

    async fn transition_status(&self, change: StatusChange) -> Result<Option<CommittedTransition>, LedgerError> {
        // The conditional update is the first statement so that this transaction takes the write lock up front
        let mut tx = self.pool.begin().await?;
        let Some(donation) = donations::conditional_update_status(&change, &mut tx).await? else {
            return Ok(None);
        };
        let kind = match change.to {
            DonationStatus::Success => Some(TransitionKind::Success),
            DonationStatus::Refunded => Some(TransitionKind::Refund),
            _ => None,
        };
        let ticket = match (kind, change.to.funding_direction()) {
            (Some(kind), Some(direction)) if donation.is_attributed() => {
                let delta = AggregateDelta {
                    program_id: donation.program_id.clone(),
                    referral_code_id: donation.referral_code_id.clone(),
                    amount: donation.amount,
                    direction,
                };
                let payment_id = donation.gateway_payment_id.as_ref().map(|p| p.as_str()).unwrap_or_default();
                journal::insert_ticket(&donation.id, payment_id, kind, &delta, &mut tx).await?
            },
            _ => None,
        };
        tx.commit().await?;
        trace!("🗃️ Transition committed for {donation}");
        Ok(Some(CommittedTransition { donation, ticket }))
    }

    async fn record_authorized_payment(
        &self,
        order_id: &OrderId,
        payment_id: &PaymentId,
    ) -> Result<Option<Donation>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let donation = donations::record_authorized_payment(order_id, payment_id, &mut tx).await?;
        tx.commit().await?;
        Ok(donation)
    }
}

impl AggregateStore for SqliteDatabase {
    async fn apply_propagation(&self, ticket: &PropagationTicket) -> Result<bool, LedgerError> {
        let mut tx = self.pool.begin().await?;
        if !journal::claim_ticket(ticket.id, &mut tx).await? {
            debug!("🗃️ Journal entry #{} has already been applied", ticket.id);
            return Ok(false);
        }
        let amount = ticket.delta.signed_amount();
        let count = ticket.delta.direction.signum();
        if let Some(program_id) = &ticket.delta.program_id {
            programs::adjust_totals(program_id, amount, count, &mut tx).await?;
        }
        if let Some(code_id) = &ticket.delta.referral_code_id {
            referral_codes::adjust_totals(code_id, amount, count, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn fetch_pending_propagations(&self, limit: i64) -> Result<Vec<PropagationTicket>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let tickets = journal::fetch_pending(limit, &mut conn).await?;
        Ok(tickets)
    }

    async fn fetch_program(&self, id: &ProgramId) -> Result<Option<Program>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let program = programs::fetch_program(id, &mut conn).await?;
        Ok(program)
    }

    async fn fetch_referral_code(&self, id: &ReferralCodeId) -> Result<Option<ReferralCode>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let code = referral_codes::fetch_referral_code(id, &mut conn).await?;
        Ok(code)
    }

    async fn recompute_program_totals(&self, id: &ProgramId) -> Result<Program, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let program = programs::recompute_totals(id, &mut tx).await?;
        tx.commit().await?;
        Ok(program)
    }

    async fn recompute_referral_totals(&self, id: &ReferralCodeId) -> Result<ReferralCode, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let code = referral_codes::recompute_totals(id, &mut tx).await?;
        tx.commit().await?;
        Ok(code)
    }
}

impl ReferralManagement for SqliteDatabase {
    async fn resolve_referral_code(&self, code: &str) -> Result<Option<ResolvedReferral>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let resolved = referral_codes::resolve(code, &mut conn).await?;
        Ok(resolved)
    }
}
