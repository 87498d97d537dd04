//! Audit trail hooks.
//!
//! Every committed donation outcome is written as a single line to the `dpg::audit` log target. Point that target at
//! durable storage with `RUST_LOG` and the logger of your choice.
use donation_engine::events::{
    DonationFailedEvent,
    DonationRefundedEvent,
    DonationSucceededEvent,
    EventHandlers,
    EventHooks,
};
use log::*;

pub const AUDIT_EVENT_BUFFER_SIZE: usize = 50;
pub const AUDIT_LOG_TARGET: &str = "dpg::audit";

pub fn create_audit_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_donation_succeeded(|ev| {
        let DonationSucceededEvent { donation, propagated } = ev;
        Box::pin(async move {
            info!(
                target: AUDIT_LOG_TARGET,
                "SUCCESS donation={} order={} payment={} amount={} currency={} program={} referral={} aggregates={}",
                donation.id,
                donation.gateway_order_id,
                donation.gateway_payment_id.as_ref().map(|p| p.as_str()).unwrap_or("-"),
                donation.amount,
                donation.currency,
                donation.program_id.as_ref().map(|p| p.as_str()).unwrap_or("-"),
                donation.referral_code_id.as_ref().map(|r| r.as_str()).unwrap_or("-"),
                if propagated { "applied" } else { "pending" }
            );
        })
    });
    hooks.on_donation_failed(|ev| {
        let DonationFailedEvent { donation, reason } = ev;
        Box::pin(async move {
            info!(
                target: AUDIT_LOG_TARGET,
                "FAILED donation={} order={} amount={} currency={} reason=\"{reason}\"",
                donation.id,
                donation.gateway_order_id,
                donation.amount,
                donation.currency
            );
        })
    });
    hooks.on_donation_refunded(|ev| {
        let DonationRefundedEvent { donation, propagated } = ev;
        Box::pin(async move {
            info!(
                target: AUDIT_LOG_TARGET,
                "REFUNDED donation={} order={} payment={} amount={} currency={} aggregates={}",
                donation.id,
                donation.gateway_order_id,
                donation.gateway_payment_id.as_ref().map(|p| p.as_str()).unwrap_or("-"),
                donation.amount,
                donation.currency,
                if propagated { "reversed" } else { "pending" }
            );
        })
    });
    EventHandlers::new(AUDIT_EVENT_BUFFER_SIZE, hooks)
}
