use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db::traits::{AggregateStore, DonationLedger, ReferralManagement},
    db_types::{Donation, DonationId, MinorUnits, NewDonation, ProgramId},
    donation_api::{errors::ReconciliationError, referral_api::ReferralApi},
    gateway::{GatewayOrder, PaymentGatewayClient},
};

/// A donor's request to start a donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationOrderRequest {
    pub amount: MinorUnits,
    pub currency: String,
    pub donor_name: String,
    #[serde(default)]
    pub donor_email: Option<String>,
    #[serde(default)]
    pub donor_phone: Option<String>,
    #[serde(default)]
    pub program_id: Option<ProgramId>,
    #[serde(default)]
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DonationOrder {
    pub donation: Donation,
    pub order: GatewayOrder,
}

/// Creates gateway orders and binds each one to a new `PENDING` donation.
#[derive(Clone)]
pub struct DonationFlowApi<B, G> {
    db: B,
    gateway: G,
    referrals: ReferralApi<B>,
}

impl<B, G> Debug for DonationFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DonationFlowApi")
    }
}

impl<B, G> DonationFlowApi<B, G>
where
    B: DonationLedger + AggregateStore + ReferralManagement,
    G: PaymentGatewayClient,
{
    pub fn new(db: B, gateway: G) -> Self {
        let referrals = ReferralApi::new(db.clone());
        Self { db, gateway, referrals }
    }

    /// Validates the request, resolves the program and referral code, creates the gateway order and stores the
    /// donation. Nothing is stored if any step fails.
    ///
    /// A referral code that is supplied but does not resolve is an error rather than being silently dropped, so that
    /// the donor can correct it.
    pub async fn create_donation_order(&self, request: DonationOrderRequest) -> Result<DonationOrder, ReconciliationError> {
        validate_request(&request)?;
        if let Some(program_id) = &request.program_id {
            if self.db.fetch_program(program_id).await?.is_none() {
                return Err(ReconciliationError::ProgramNotFound(program_id.to_string()));
            }
        }
        let referral = match request.referral_code.as_deref().filter(|c| !c.is_empty()) {
            Some(code) => Some(
                self.referrals
                    .resolve(code)
                    .await?
                    .ok_or_else(|| ReconciliationError::InvalidReferralCode(code.to_string()))?,
            ),
            None => None,
        };
        let id = DonationId::random();
        let currency = request.currency.to_uppercase();
        let order = self.gateway.create_order(request.amount, &currency, id.as_str()).await?;
        debug!("🔄️ Gateway order {} created for donation {id}", order.id);
        let mut donation = NewDonation::new(id, request.amount, &currency, order.id.clone(), request.donor_name.trim())
            .with_contact(request.donor_email, request.donor_phone);
        if let Some(program_id) = request.program_id {
            donation = donation.with_program(program_id);
        }
        if let Some(referral) = referral {
            donation = donation.with_referral(referral);
        }
        let donation = self.db.insert_donation(donation).await?;
        info!("🔄️ New donation: {donation}");
        Ok(DonationOrder { donation, order })
    }
}

fn validate_request(request: &DonationOrderRequest) -> Result<(), ReconciliationError> {
    if !request.amount.is_positive() {
        return Err(ReconciliationError::InvalidRequest("Amount must be greater than zero".into()));
    }
    if request.currency.len() != 3 || !request.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ReconciliationError::InvalidRequest(format!(
            "'{}' is not a three-letter currency code",
            request.currency
        )));
    }
    if request.donor_name.trim().is_empty() {
        return Err(ReconciliationError::InvalidRequest("Donor name is required".into()));
    }
    Ok(())
}
