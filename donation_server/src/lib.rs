//! # Donation gateway server
//! This module hosts the HTTP server for the donation payment gateway. It is responsible for:
//! * Creating gateway orders for new donations.
//! * Verifying the payment confirmations relayed by donors' browsers.
//! * Receiving, authenticating and processing Razorpay webhook calls.
//! * Periodically repairing program and referral totals whose update did not land.
//!
//! All reconciliation logic lives in `donation_engine`. This crate is the HTTP plumbing around it.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/donations/order`: Starts a donation.
//! * `/api/donations/verify`: Client-side payment verification.
//! * `/razorpay/webhook`: The Razorpay webhook.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod repair_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
