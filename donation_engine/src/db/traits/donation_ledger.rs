use thiserror::Error;

use crate::db_types::{
    CommittedTransition,
    Donation,
    DonationId,
    DonationLookup,
    NewDonation,
    OrderId,
    PaymentId,
    StatusChange,
};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Donation {0} already exists")]
    DonationAlreadyExists(DonationId),
    #[error("Gateway order {0} is already bound to a donation")]
    OrderAlreadyBound(OrderId),
    #[error("Program {0} does not exist")]
    ProgramNotFound(String),
    #[error("Referral code {0} does not exist")]
    ReferralCodeNotFound(String),
    #[error("The database contains an invalid record. {0}")]
    CorruptRecord(String),
}

/// The durable per-donation record and its status machine.
#[allow(async_fn_in_trait)]
pub trait DonationLedger: Clone {
    /// Binds a new donation to its gateway order. The donation is stored with `PENDING` status.
    ///
    /// The gateway order id can only ever be bound once. Attempting to bind it a second time returns
    /// [`LedgerError::OrderAlreadyBound`].
    async fn insert_donation(&self, donation: NewDonation) -> Result<Donation, LedgerError>;

    /// Fetches a donation by its internal id, gateway order id or gateway payment id.
    async fn fetch_donation(&self, lookup: &DonationLookup) -> Result<Option<Donation>, LedgerError>;

    /// Atomically moves a donation from `change.from` to `change.to`.
    ///
    /// The write only happens if the donation is *still* in `change.from` at the moment of writing. If another writer
    /// got there first, nothing is changed and `None` is returned; callers should reload and re-evaluate.
    ///
    /// When the write succeeds:
    /// * the payment id is recorded (for `SUCCESS`, it replaces any pre-capture id; otherwise it is only filled in if
    ///   none was recorded yet),
    /// * the reason, if any, is stored as the failure reason,
    /// * if the new status moves funds and the donation is attributed to a program or referral code, a propagation
    ///   ticket is written to the journal in the same transaction and returned.
    async fn transition_status(&self, change: StatusChange) -> Result<Option<CommittedTransition>, LedgerError>;

    /// Pre-capture bookkeeping: records the payment id on a `PENDING` donation bound to `order_id` without touching its
    /// status. Donations that are no longer pending are left alone.
    ///
    /// Returns the donation as stored after the call, or `None` if no donation is bound to the order.
    async fn record_authorized_payment(
        &self,
        order_id: &OrderId,
        payment_id: &PaymentId,
    ) -> Result<Option<Donation>, LedgerError>;
}
