//! # Donation payment engine public API
//!
//! Every external signal about a payment ends up in the same place. The client verification call and the gateway
//! webhook each turn their evidence into a [`CandidateTransition`] and hand it to the [`TransitionGuard`]. The guard
//! is the only component that changes a donation's status. When it commits a transition that moves funds, it hands
//! the resulting journal entry to the [`AggregatePropagator`], which adjusts the program and referral totals exactly
//! once.
//!
//! * [`order_flow_api`] creates gateway orders and binds them to new `PENDING` donations.
//! * [`verification_api`] handles the donor's browser confirming a payment.
//! * [`webhook_api`] authenticates and handles gateway webhook events.
//! * [`referral_api`] resolves referral codes at order creation.
//! * [`transition_guard`] and [`aggregate_propagator`] are the reconciliation core.
//!
//! Each API is constructed from a storage backend implementing the traits it needs, e.g.
//!
//! ```rust,ignore
//! let db = SqliteDatabase::new_with_url("sqlite://data/donations.db", 25).await?;
//! let guard = TransitionGuard::new(db.clone(), producers);
//! let api = WebhookApi::new(guard, webhook_secret);
//! let outcome = api.handle(&raw_body, signature_header).await?;
//! ```
pub mod aggregate_propagator;
pub mod errors;
pub mod order_flow_api;
pub mod referral_api;
pub mod transition_guard;
pub mod verification_api;
pub mod webhook_api;
pub mod webhook_objects;
