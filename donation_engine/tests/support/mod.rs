#![allow(dead_code)]
pub mod prepare_env;

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use donation_engine::{
    db_types::{
        AccountId,
        Donation,
        DonationId,
        MinorUnits,
        NewDonation,
        NewProgram,
        NewReferralCode,
        OrderId,
        PaymentId,
        ProgramId,
        ReferralCodeId,
        ResolvedReferral,
    },
    events::EventProducers,
    helpers::{calculate_hmac_sha256, payment_signature_message},
    DonationLedger,
    GatewayError,
    GatewayOrder,
    GatewayPayment,
    PaymentGatewayClient,
    SqliteDatabase,
    TransitionGuard,
};
use dpg_common::Secret;
use serde_json::json;

pub const KEY_SECRET: &str = "rzp_test_key_secret";
pub const WEBHOOK_SECRET: &str = "rzp_test_webhook_secret";
pub const PROGRAM: &str = "prog_clean_water";
pub const REFERRAL: &str = "ref_asha";
pub const REFERRAL_CODE: &str = "ASHA2024";

/// A payment gateway that hands out sequential order ids and reports every payment as captured.
#[derive(Clone, Default)]
pub struct StubGateway {
    orders: Arc<AtomicU64>,
    offline: Arc<AtomicBool>,
}

impl StubGateway {
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn orders_created(&self) -> u64 {
        self.orders.load(Ordering::SeqCst)
    }
}

impl PaymentGatewayClient for StubGateway {
    async fn create_order(&self, amount: MinorUnits, currency: &str, receipt: &str) -> Result<GatewayOrder, GatewayError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::RequestFailed("connection refused".into()));
        }
        let n = self.orders.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: OrderId::from(format!("order_stub{n:06}")),
            amount,
            currency: currency.to_string(),
            receipt: Some(receipt.to_string()),
            status: "created".into(),
        })
    }

    async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<GatewayPayment, GatewayError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::RequestFailed("connection refused".into()));
        }
        Ok(GatewayPayment {
            id: payment_id.clone(),
            order_id: None,
            amount: MinorUnits::from(0),
            currency: "INR".into(),
            status: "captured".into(),
            method: Some("upi".into()),
        })
    }
}

pub fn key_secret() -> Secret<String> {
    Secret::new(KEY_SECRET.to_string())
}

pub fn webhook_secret() -> Secret<String> {
    Secret::new(WEBHOOK_SECRET.to_string())
}

/// Seeds a program and an active referral code.
pub async fn seed_aggregates(db: &SqliteDatabase) {
    db.insert_program(NewProgram::new(ProgramId::from(PROGRAM), "Clean water").with_target(MinorUnits::from(10_000_000)))
        .await
        .expect("Error inserting program");
    db.insert_referral_code(NewReferralCode::new(
        ReferralCodeId::from(REFERRAL),
        REFERRAL_CODE,
        AccountId::from("coordinator_asha"),
    ))
    .await
    .expect("Error inserting referral code");
}

/// Inserts a pending donation bound to `order_id`, attributed to the seeded program and referral code.
pub async fn seed_donation(db: &SqliteDatabase, order_id: &str, amount: i64) -> Donation {
    let referral = ResolvedReferral {
        referral_code_id: ReferralCodeId::from(REFERRAL),
        owner_account_id: AccountId::from("coordinator_asha"),
        parent_code_id: None,
    };
    let donation = NewDonation::new(DonationId::random(), MinorUnits::from(amount), "INR", OrderId::from(order_id), "Ravi")
        .with_program(ProgramId::from(PROGRAM))
        .with_referral(referral);
    db.insert_donation(donation).await.expect("Error inserting donation")
}

pub fn guard(db: &SqliteDatabase) -> TransitionGuard<SqliteDatabase> {
    TransitionGuard::new(db.clone(), EventProducers::default())
}

pub fn payment_signature(order_id: &str, payment_id: &str) -> String {
    calculate_hmac_sha256(payment_signature_message(order_id, payment_id).as_bytes(), KEY_SECRET.as_bytes())
}

pub fn webhook_signature(body: &[u8]) -> String {
    calculate_hmac_sha256(body, WEBHOOK_SECRET.as_bytes())
}

pub fn payment_event(event: &str, payment_id: &str, order_id: &str, amount: i64) -> Vec<u8> {
    let status = match event {
        "payment.failed" => "failed",
        "payment.authorized" => "authorized",
        _ => "captured",
    };
    let mut entity = json!({
        "id": payment_id,
        "entity": "payment",
        "amount": amount,
        "currency": "INR",
        "status": status,
        "order_id": order_id,
        "method": "upi",
    });
    if event == "payment.failed" {
        entity["error_code"] = json!("BAD_REQUEST_ERROR");
        entity["error_description"] = json!("Payment was declined by the bank");
    }
    let body = json!({
        "entity": "event",
        "event": event,
        "contains": ["payment"],
        "payload": { "payment": { "entity": entity } },
        "created_at": 1_726_000_000,
    });
    serde_json::to_vec(&body).expect("Error serializing event")
}

pub fn refund_event(refund_id: &str, payment_id: &str, amount: i64) -> Vec<u8> {
    let body = json!({
        "entity": "event",
        "event": "refund.processed",
        "contains": ["refund", "payment"],
        "payload": {
            "refund": { "entity": {
                "id": refund_id,
                "entity": "refund",
                "amount": amount,
                "currency": "INR",
                "payment_id": payment_id,
                "status": "processed",
            }}
        },
        "created_at": 1_726_000_100,
    });
    serde_json::to_vec(&body).expect("Error serializing event")
}
