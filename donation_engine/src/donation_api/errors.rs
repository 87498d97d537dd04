use thiserror::Error;

use crate::{
    db::traits::LedgerError,
    db_types::{DonationLookup, DonationStatus, OrderId},
    gateway::GatewayError,
};

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("Payment signature verification failed")]
    InvalidSignature,
    #[error("No webhook signature was provided")]
    MissingWebhookSignature,
    #[error("Invalid webhook signature")]
    InvalidWebhookSignature,
    #[error("No donation found for {0}")]
    DonationNotFound(DonationLookup),
    #[error("Order {received} does not belong to this donation (expected {expected})")]
    OrderMismatch { expected: OrderId, received: OrderId },
    #[error("The payment could not be confirmed. The donation is {status}")]
    DonationNotSuccessful { status: DonationStatus },
    #[error("Referral code '{0}' is not valid")]
    InvalidReferralCode(String),
    #[error("Program {0} does not exist")]
    ProgramNotFound(String),
    #[error("Payment gateway error. {0}")]
    GatewayError(#[from] GatewayError),
    #[error("Database error. {0}")]
    DatabaseError(String),
}

impl From<LedgerError> for ReconciliationError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::ProgramNotFound(id) => ReconciliationError::ProgramNotFound(id),
            e => ReconciliationError::DatabaseError(e.to_string()),
        }
    }
}
