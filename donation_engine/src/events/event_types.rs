use serde::{Deserialize, Serialize};

use crate::db_types::{Donation, DonationStatus};

/// Published once a donation has been reconciled as successful. Duplicate signals do not publish it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationSucceededEvent {
    pub donation: Donation,
    /// False if the aggregate update failed and is waiting on the repair worker.
    pub propagated: bool,
}

impl DonationSucceededEvent {
    pub fn new(donation: Donation, propagated: bool) -> Self {
        Self { donation, propagated }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationFailedEvent {
    pub donation: Donation,
    pub reason: String,
}

impl DonationFailedEvent {
    pub fn new(donation: Donation) -> Self {
        let reason = donation.failure_reason.clone().unwrap_or_else(|| "unspecified".to_string());
        Self { donation, reason }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRefundedEvent {
    pub donation: Donation,
    pub propagated: bool,
}

impl DonationRefundedEvent {
    pub fn new(donation: Donation, propagated: bool) -> Self {
        Self { donation, propagated }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    DonationSucceeded(DonationSucceededEvent),
    DonationFailed(DonationFailedEvent),
    DonationRefunded(DonationRefundedEvent),
}

impl EventType {
    /// The event a freshly committed transition into `donation.status` should publish.
    pub fn for_transition(donation: Donation, propagated: bool) -> Option<Self> {
        match donation.status {
            DonationStatus::Success => Some(Self::DonationSucceeded(DonationSucceededEvent::new(donation, propagated))),
            DonationStatus::Failed => Some(Self::DonationFailed(DonationFailedEvent::new(donation))),
            DonationStatus::Refunded => Some(Self::DonationRefunded(DonationRefundedEvent::new(donation, propagated))),
            DonationStatus::Pending => None,
        }
    }
}
