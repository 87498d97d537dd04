use crate::{db::traits::LedgerError, db_types::ResolvedReferral};

#[allow(async_fn_in_trait)]
pub trait ReferralManagement: Clone {
    /// Resolves `code` to its referral code id and owner. The match is exact and case-sensitive, and only active codes
    /// resolve.
    async fn resolve_referral_code(&self, code: &str) -> Result<Option<ResolvedReferral>, LedgerError>;
}
