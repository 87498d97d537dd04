use actix_web::{http::StatusCode, web, web::ServiceConfig};
use donation_engine::{events::EventProducers, helpers::calculate_hmac_sha256, TransitionGuard, WebhookApi};
use dpg_common::Secret;
use serde_json::Value;

use super::{helpers::*, mocks::MockLedger};
use crate::{
    config::{ServerConfig, ServerOptions},
    routes::{RazorpayWebhookRoute, RAZORPAY_SIGNATURE_HEADER},
};

fn configure_webhook(ledger: MockLedger) -> impl FnOnce(&mut ServiceConfig) {
    configure_webhook_with_secret(ledger, webhook_secret())
}

fn configure_webhook_with_secret(ledger: MockLedger, secret: Secret<String>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let guard = TransitionGuard::new(ledger, EventProducers::default());
        let api = WebhookApi::new(guard, secret);
        let scope = web::scope("/razorpay").service(RazorpayWebhookRoute::<MockLedger>::new());
        cfg.service(scope)
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(ServerOptions::from_config(&ServerConfig::default())));
    }
}

fn untouched_ledger() -> MockLedger {
    let mut ledger = MockLedger::new();
    ledger.expect_fetch_donation().never();
    ledger.expect_transition_status().never();
    ledger.expect_clone().returning(untouched_ledger);
    ledger
}

#[actix_web::test]
async fn missing_signature() {
    let _ = env_logger::try_init().ok();
    let body = payment_event("payment.captured", ORDER_ID, 50_000);
    let (status, body) = post_request("/razorpay/webhook", body, &[], configure_webhook(untouched_ledger())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"No webhook signature was provided"}"#);
}

#[actix_web::test]
async fn invalid_signature() {
    let _ = env_logger::try_init().ok();
    let body = payment_event("payment.captured", ORDER_ID, 50_000);
    // Signed over a different body
    let signature = webhook_signature(&payment_event("payment.captured", ORDER_ID, 1));
    let headers = [(RAZORPAY_SIGNATURE_HEADER, signature.as_str())];
    let (status, body) = post_request("/razorpay/webhook", body, &headers, configure_webhook(untouched_ledger())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Invalid webhook signature"}"#);
}

#[actix_web::test]
async fn unconfigured_secret_rejects_everything() {
    let _ = env_logger::try_init().ok();
    let body = payment_event("payment.captured", ORDER_ID, 50_000);
    let signature = calculate_hmac_sha256(&body, b"");
    let headers = [(RAZORPAY_SIGNATURE_HEADER, signature.as_str())];
    let configure = configure_webhook_with_secret(untouched_ledger(), Secret::new(String::new()));
    let (status, body) = post_request("/razorpay/webhook", body, &headers, configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Invalid webhook signature"}"#);
}

#[actix_web::test]
async fn malformed_envelope() {
    let _ = env_logger::try_init().ok();
    let body = br#"{"entity": "event", "payload": "#.to_vec();
    let signature = webhook_signature(&body);
    let headers = [(RAZORPAY_SIGNATURE_HEADER, signature.as_str())];
    let (status, _) = post_request("/razorpay/webhook", body, &headers, configure_webhook(untouched_ledger())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn payment_captured() {
    let _ = env_logger::try_init().ok();
    let body = payment_event("payment.captured", ORDER_ID, 50_000);
    let signature = webhook_signature(&body);
    let headers = [(RAZORPAY_SIGNATURE_HEADER, signature.as_str())];
    let (status, body) = post_request("/razorpay/webhook", body, &headers, configure_webhook(pending_ledger())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let res = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(res["success"], true);
    assert_eq!(res["processed"], true);
    assert_eq!(res["donationId"], DONATION_ID);
}

#[actix_web::test]
async fn payment_captured_amount_mismatch() {
    let _ = env_logger::try_init().ok();
    let body = payment_event("payment.captured", ORDER_ID, 40_000);
    let signature = webhook_signature(&body);
    let headers = [(RAZORPAY_SIGNATURE_HEADER, signature.as_str())];
    let (status, body) = post_request("/razorpay/webhook", body, &headers, configure_webhook(pending_ledger())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let res = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(res["success"], false);
    assert_eq!(res["processed"], true);
}

#[actix_web::test]
async fn unknown_order_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = payment_event("payment.captured", "order_Unknown00000", 50_000);
    let signature = webhook_signature(&body);
    let headers = [(RAZORPAY_SIGNATURE_HEADER, signature.as_str())];
    let (status, body) = post_request("/razorpay/webhook", body, &headers, configure_webhook(empty_ledger())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let res = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(res["success"], false);
    assert_eq!(res["processed"], false);
}

#[actix_web::test]
async fn unhandled_event() {
    let _ = env_logger::try_init().ok();
    let body = payment_event("payment.dispute.created", ORDER_ID, 50_000);
    let signature = webhook_signature(&body);
    let headers = [(RAZORPAY_SIGNATURE_HEADER, signature.as_str())];
    let (status, body) = post_request("/razorpay/webhook", body, &headers, configure_webhook(untouched_ledger())).await;
    assert_eq!(status, StatusCode::OK);
    let res = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(res["success"], true);
    assert_eq!(res["processed"], false);
}
