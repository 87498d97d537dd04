mod aggregate_store;
mod donation_ledger;
mod referral_management;

pub use aggregate_store::AggregateStore;
pub use donation_ledger::{DonationLedger, LedgerError};
pub use referral_management::ReferralManagement;

/// Everything the donation flows need from storage, as a single bound.
pub trait DonationStore: DonationLedger + AggregateStore + ReferralManagement {}

impl<T> DonationStore for T where T: DonationLedger + AggregateStore + ReferralManagement {}
