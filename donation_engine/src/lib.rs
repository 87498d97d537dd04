//! Donation Payment Engine
//!
//! The donation payment engine reconciles the outcome of donations made through a third-party payment gateway. A
//! donation's true outcome is learned from two independent, unordered signals: the donor's browser confirming the
//! payment, and the gateway's webhook. This library turns either signal, in any order and any number of times, into
//! exactly one status change and exactly one adjustment of the program and referral code totals.
//!
//! The library is divided into three main sections:
//! 1. Storage ([`mod@db`]). The engine only ever talks to storage through the traits in [`db::traits`]. SQLite is the
//!    supported backend. The data types stored in the database are defined in [`db_types`] and are public.
//! 2. The engine public API ([`donation_api`]). Order creation, client verification, webhook handling and the
//!    reconciliation core (the [`TransitionGuard`] and the [`AggregatePropagator`]).
//! 3. Collaborators: the [`gateway`] trait the engine uses to talk to the payment gateway, and the signature checks in
//!    [`helpers`].
//!
//! The engine also publishes events when donations succeed, fail or are refunded. A simple actor framework in
//! [`events`] lets you hook into these and perform custom actions.
pub mod db;

pub mod db_types;
pub mod donation_api;
pub mod events;
pub mod gateway;
pub mod helpers;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{AggregateStore, DonationLedger, DonationStore, LedgerError, ReferralManagement};
pub use donation_api::{
    aggregate_propagator::{AggregatePropagator, ReplaySummary},
    errors::ReconciliationError,
    order_flow_api::{DonationFlowApi, DonationOrder, DonationOrderRequest},
    referral_api::ReferralApi,
    transition_guard::{CandidateTransition, TransitionEvidence, TransitionGuard, TransitionOutcome},
    verification_api::{PaymentVerificationRequest, PaymentVerificationResult, VerificationApi},
    webhook_api::WebhookApi,
    webhook_objects,
};
pub use gateway::{GatewayError, GatewayOrder, GatewayPayment, PaymentGatewayClient};
