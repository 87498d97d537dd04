use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use donation_engine::{
    db_types::{CommittedTransition, Donation, DonationId, DonationStatus, MinorUnits, OrderId, PaymentId, StatusChange},
    helpers::{calculate_hmac_sha256, payment_signature_message},
};
use dpg_common::Secret;
use log::debug;
use serde_json::json;

use super::mocks::MockLedger;
use crate::server::json_config;

pub const KEY_ID: &str = "rzp_test_1DP5mmOlF5G5ag";
pub const KEY_SECRET: &str = "rzp_test_key_secret";
pub const WEBHOOK_SECRET: &str = "rzp_test_webhook_secret";
pub const DONATION_ID: &str = "66e6a2f1c5d9b1a4f0e3c7d2";
pub const ORDER_ID: &str = "order_NbSe8yZ8s0ZQ7c";
pub const PAYMENT_ID: &str = "pay_NbSeHzD3fYd2mJ";

pub fn key_secret() -> Secret<String> {
    Secret::new(KEY_SECRET.to_string())
}

pub fn webhook_secret() -> Secret<String> {
    Secret::new(WEBHOOK_SECRET.to_string())
}

pub fn payment_signature(order_id: &str, payment_id: &str) -> String {
    calculate_hmac_sha256(payment_signature_message(order_id, payment_id).as_bytes(), KEY_SECRET.as_bytes())
}

pub fn webhook_signature(body: &[u8]) -> String {
    calculate_hmac_sha256(body, WEBHOOK_SECRET.as_bytes())
}

pub fn donation(status: DonationStatus) -> Donation {
    let timestamp = Utc.with_ymd_and_hms(2024, 9, 15, 10, 30, 0).unwrap();
    Donation {
        id: DonationId::from(DONATION_ID),
        amount: MinorUnits::from(50_000),
        currency: "INR".to_string(),
        donor_name: "Ravi".to_string(),
        donor_email: Some("ravi@example.com".to_string()),
        donor_phone: None,
        status,
        gateway_order_id: OrderId::from(ORDER_ID),
        gateway_payment_id: (status != DonationStatus::Pending).then(|| PaymentId::from(PAYMENT_ID)),
        program_id: None,
        referral_code_id: None,
        referral_owner_id: None,
        failure_reason: (status == DonationStatus::Failed).then(|| "Payment was declined".to_string()),
        created_at: timestamp,
        updated_at: timestamp,
    }
}

/// A ledger that holds one pending donation and commits whatever status change it is asked to make.
pub fn pending_ledger() -> MockLedger {
    let mut ledger = MockLedger::new();
    ledger.expect_fetch_donation().returning(|_| Ok(Some(donation(DonationStatus::Pending))));
    ledger.expect_transition_status().returning(|change: StatusChange| {
        let mut updated = donation(change.to);
        updated.failure_reason = change.reason;
        Ok(Some(CommittedTransition { donation: updated, ticket: None }))
    });
    ledger.expect_clone().returning(pending_ledger);
    ledger
}

/// A ledger that knows of no donations at all.
pub fn empty_ledger() -> MockLedger {
    let mut ledger = MockLedger::new();
    ledger.expect_fetch_donation().returning(|_| Ok(None));
    ledger.expect_clone().returning(empty_ledger);
    ledger
}

pub fn payment_event(event: &str, order_id: &str, amount: i64) -> Vec<u8> {
    let body = json!({
        "entity": "event",
        "event": event,
        "contains": ["payment"],
        "payload": { "payment": { "entity": {
            "id": PAYMENT_ID,
            "entity": "payment",
            "amount": amount,
            "currency": "INR",
            "status": "captured",
            "order_id": order_id,
            "method": "upi",
        }}},
        "created_at": 1_726_000_000,
    });
    serde_json::to_vec(&body).unwrap()
}

pub async fn post_request(
    path: &str,
    body: Vec<u8>,
    headers: &[(&str, &str)],
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri(path).insert_header(("Content-Type", "application/json"));
    for &(name, value) in headers {
        req = req.insert_header((name, value));
    }
    let req = req.set_payload(body).to_request();
    let app = App::new().app_data(json_config()).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request to {path}");
    let res = match test::try_call_service(&service, req).await {
        Ok(res) => res.map_into_boxed_body().into_parts().1,
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}
