use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use dpg_common::{Direction, MinorUnits};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

/// Declares a string-backed identifier newtype that is stored transparently in the database.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_type!(
    /// The internal donation identifier, a 24-character hex string.
    DonationId
);
id_type!(
    /// The order identifier assigned by the payment gateway, e.g. `order_NbSe8yZ8s0ZQ7c`.
    OrderId
);
id_type!(
    /// The payment identifier assigned by the payment gateway, e.g. `pay_NbSeHzD3fYd2mJ`.
    PaymentId
);
id_type!(ProgramId);
id_type!(ReferralCodeId);
id_type!(
    /// The coordinator account that owns a referral code.
    AccountId
);

impl DonationId {
    /// Generates a fresh random identifier.
    pub fn random() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn is_valid(&self) -> bool {
        dpg_common::helpers::is_record_id(self.as_str())
    }
}

//--------------------------------------   DonationStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DonationStatus {
    /// A gateway order exists, but no payment outcome has been reconciled yet.
    Pending,
    /// The payment was captured. The donation counts towards its program and referral totals.
    Success,
    /// The payment failed, was rejected, or disagreed with the bound donation.
    Failed,
    /// A previously successful payment was refunded. Its contribution has been reversed.
    Refunded,
}

impl DonationStatus {
    /// The only legal moves are `Pending -> Success`, `Pending -> Failed` and `Success -> Refunded`.
    pub fn can_transition_to(&self, target: DonationStatus) -> bool {
        use DonationStatus::*;
        matches!((self, target), (Pending, Success) | (Pending, Failed) | (Success, Refunded))
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DonationStatus::Pending)
    }

    /// The aggregate adjustment that entering this status implies, if any.
    pub fn funding_direction(&self) -> Option<Direction> {
        match self {
            DonationStatus::Success => Some(Direction::Credit),
            DonationStatus::Refunded => Some(Direction::Debit),
            _ => None,
        }
    }
}

impl Display for DonationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DonationStatus::Pending => write!(f, "PENDING"),
            DonationStatus::Success => write!(f, "SUCCESS"),
            DonationStatus::Failed => write!(f, "FAILED"),
            DonationStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid donation status: {0}")]
pub struct DonationStatusConversionError(String);

impl FromStr for DonationStatus {
    type Err = DonationStatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            "REFUNDED" => Ok(Self::Refunded),
            _ => Err(DonationStatusConversionError(s.to_string())),
        }
    }
}

//--------------------------------------      Donation        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    pub amount: MinorUnits,
    pub currency: String,
    pub donor_name: String,
    pub donor_email: Option<String>,
    pub donor_phone: Option<String>,
    pub status: DonationStatus,
    pub gateway_order_id: OrderId,
    pub gateway_payment_id: Option<PaymentId>,
    pub program_id: Option<ProgramId>,
    pub referral_code_id: Option<ReferralCodeId>,
    pub referral_owner_id: Option<AccountId>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Donation {
    /// True if the donation has already been reconciled as successful against this exact payment.
    pub fn succeeded_with(&self, payment_id: &PaymentId) -> bool {
        self.status == DonationStatus::Success && self.gateway_payment_id.as_ref() == Some(payment_id)
    }

    /// True if the donation contributes to any aggregate.
    pub fn is_attributed(&self) -> bool {
        self.program_id.is_some() || self.referral_code_id.is_some()
    }
}

impl Display for Donation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Donation #{} [{}] {} {} order: {} payment: {}",
            self.id,
            self.status,
            self.amount,
            self.currency,
            self.gateway_order_id,
            self.gateway_payment_id.as_ref().map(|p| p.as_str()).unwrap_or("none")
        )
    }
}

/// A donation that is about to be bound to a freshly created gateway order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDonation {
    pub id: DonationId,
    pub amount: MinorUnits,
    pub currency: String,
    pub donor_name: String,
    pub donor_email: Option<String>,
    pub donor_phone: Option<String>,
    pub gateway_order_id: OrderId,
    pub program_id: Option<ProgramId>,
    pub referral_code_id: Option<ReferralCodeId>,
    pub referral_owner_id: Option<AccountId>,
}

impl NewDonation {
    pub fn new(id: DonationId, amount: MinorUnits, currency: &str, order_id: OrderId, donor_name: &str) -> Self {
        Self {
            id,
            amount,
            currency: currency.to_uppercase(),
            donor_name: donor_name.to_string(),
            donor_email: None,
            donor_phone: None,
            gateway_order_id: order_id,
            program_id: None,
            referral_code_id: None,
            referral_owner_id: None,
        }
    }

    pub fn with_program(mut self, program_id: ProgramId) -> Self {
        self.program_id = Some(program_id);
        self
    }

    pub fn with_referral(mut self, referral: ResolvedReferral) -> Self {
        self.referral_code_id = Some(referral.referral_code_id);
        self.referral_owner_id = Some(referral.owner_account_id);
        self
    }

    pub fn with_contact(mut self, email: Option<String>, phone: Option<String>) -> Self {
        self.donor_email = email;
        self.donor_phone = phone;
        self
    }
}

/// How a reconciliation signal identifies the donation it is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DonationLookup {
    ById(DonationId),
    ByOrderId(OrderId),
    ByPaymentId(PaymentId),
}

impl Display for DonationLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DonationLookup::ById(id) => write!(f, "donation id {id}"),
            DonationLookup::ByOrderId(id) => write!(f, "order id {id}"),
            DonationLookup::ByPaymentId(id) => write!(f, "payment id {id}"),
        }
    }
}

//--------------------------------------       Program        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    pub target_amount: Option<MinorUnits>,
    pub raised_amount: MinorUnits,
    pub donation_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProgram {
    pub id: ProgramId,
    pub name: String,
    pub target_amount: Option<MinorUnits>,
}

impl NewProgram {
    pub fn new(id: ProgramId, name: &str) -> Self {
        Self { id, name: name.to_string(), target_amount: None }
    }

    pub fn with_target(mut self, target: MinorUnits) -> Self {
        self.target_amount = Some(target);
        self
    }
}

//--------------------------------------    ReferralCode      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ReferralCode {
    pub id: ReferralCodeId,
    pub code: String,
    pub owner_account_id: AccountId,
    pub parent_code_id: Option<ReferralCodeId>,
    pub total_donations: i64,
    pub total_amount: MinorUnits,
    pub active: bool,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReferralCode {
    pub id: ReferralCodeId,
    pub code: String,
    pub owner_account_id: AccountId,
    pub parent_code_id: Option<ReferralCodeId>,
    pub active: bool,
}

impl NewReferralCode {
    pub fn new(id: ReferralCodeId, code: &str, owner: AccountId) -> Self {
        Self { id, code: code.to_string(), owner_account_id: owner, parent_code_id: None, active: true }
    }

    pub fn with_parent(mut self, parent: ReferralCodeId) -> Self {
        self.parent_code_id = Some(parent);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// The result of resolving a human-entered referral code.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ResolvedReferral {
    pub referral_code_id: ReferralCodeId,
    pub owner_account_id: AccountId,
    pub parent_code_id: Option<ReferralCodeId>,
}

//--------------------------------------  PropagationTicket   ---------------------------------------------------------
/// The kind of transition a propagation journal entry was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
pub enum TransitionKind {
    Success,
    Refund,
}

impl Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionKind::Success => write!(f, "SUCCESS"),
            TransitionKind::Refund => write!(f, "REFUND"),
        }
    }
}

/// A journal entry issued by the transition guard in the same transaction as a status change. Each ticket is
/// applied to the aggregates exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationTicket {
    pub id: i64,
    pub donation_id: DonationId,
    pub payment_id: String,
    pub kind: TransitionKind,
    pub delta: AggregateDelta,
    pub created_at: DateTime<Utc>,
}

/// The funding delta a single transition applies to a program and a referral code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateDelta {
    pub program_id: Option<ProgramId>,
    pub referral_code_id: Option<ReferralCodeId>,
    pub amount: MinorUnits,
    pub direction: Direction,
}

impl AggregateDelta {
    pub fn signed_amount(&self) -> MinorUnits {
        self.amount.signed(self.direction)
    }
}

impl Display for AggregateDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} x {} (program: {}, referral: {})",
            self.direction,
            self.amount,
            self.program_id.as_ref().map(|p| p.as_str()).unwrap_or("-"),
            self.referral_code_id.as_ref().map(|r| r.as_str()).unwrap_or("-")
        )
    }
}

//--------------------------------------    StatusChange      ---------------------------------------------------------
/// A conditional status write: move `donation_id` from `from` to `to`, but only if it is still in `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub donation_id: DonationId,
    pub from: DonationStatus,
    pub to: DonationStatus,
    pub payment_id: Option<PaymentId>,
    pub reason: Option<String>,
}

/// A status change that was committed, along with the propagation ticket issued for it (if the donation is
/// attributed to a program or referral code and the new status moves funds).
#[derive(Debug, Clone)]
pub struct CommittedTransition {
    pub donation: Donation,
    pub ticket: Option<PropagationTicket>,
}
