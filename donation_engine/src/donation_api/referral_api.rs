use std::fmt::Debug;

use log::*;

use crate::{db::traits::ReferralManagement, db_types::ResolvedReferral, donation_api::errors::ReconciliationError};

/// Resolves human-entered referral codes. This is only consulted when a donation is created; afterwards the binding
/// on the donation is fixed and never re-resolved.
#[derive(Clone)]
pub struct ReferralApi<B> {
    db: B,
}

impl<B> Debug for ReferralApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReferralApi")
    }
}

impl<B> ReferralApi<B>
where B: ReferralManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Exact, case-sensitive match against active codes. Unknown and inactive codes both resolve to `None`.
    pub async fn resolve(&self, code: &str) -> Result<Option<ResolvedReferral>, ReconciliationError> {
        if code.is_empty() {
            return Ok(None);
        }
        let resolved = self.db.resolve_referral_code(code).await?;
        match &resolved {
            Some(r) => debug!("🔄️ Referral code '{code}' resolved to {} owned by {}", r.referral_code_id, r.owner_account_id),
            None => debug!("🔄️ Referral code '{code}' did not resolve"),
        }
        Ok(resolved)
    }
}
