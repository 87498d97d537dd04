use actix_web::{http::StatusCode, web, web::ServiceConfig};
use donation_engine::{
    db_types::{AccountId, DonationStatus, MinorUnits, OrderId, ReferralCodeId, ResolvedReferral},
    events::EventProducers,
    DonationFlowApi,
    GatewayError,
    GatewayOrder,
    GatewayPayment,
    TransitionGuard,
    VerificationApi,
};
use serde_json::{json, Value};

use super::{
    helpers::*,
    mocks::{MockGateway, MockLedger},
};
use crate::{
    data_objects::CheckoutKey,
    routes::{DonationOrderRoute, VerifyPaymentRoute},
};

//----------------------------------------------   Orders  ----------------------------------------------------
fn order_ledger() -> MockLedger {
    let mut ledger = MockLedger::new();
    ledger.expect_fetch_program().returning(|_| Ok(None));
    ledger.expect_insert_donation().returning(|new| {
        let mut d = donation(DonationStatus::Pending);
        d.id = new.id;
        d.amount = new.amount;
        d.currency = new.currency;
        d.gateway_order_id = new.gateway_order_id;
        d.referral_code_id = new.referral_code_id;
        Ok(d)
    });
    ledger.expect_resolve_referral_code().returning(|code| {
        Ok((code == "ASHA2024").then(|| ResolvedReferral {
            referral_code_id: ReferralCodeId::from("ref_asha"),
            owner_account_id: AccountId::from("coordinator_asha"),
            parent_code_id: None,
        }))
    });
    ledger.expect_clone().returning(order_ledger);
    ledger
}

fn order_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().returning(|amount, currency, receipt| {
        Ok(GatewayOrder {
            id: OrderId::from(ORDER_ID),
            amount,
            currency: currency.to_string(),
            receipt: Some(receipt.to_string()),
            status: "created".into(),
        })
    });
    gateway.expect_clone().returning(order_gateway);
    gateway
}

fn configure_orders(cfg: &mut ServiceConfig) {
    let api = DonationFlowApi::new(order_ledger(), order_gateway());
    cfg.service(DonationOrderRoute::<MockLedger, MockGateway>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(CheckoutKey(KEY_ID.to_string())));
}

fn order_body(amount: i64, referral_code: Option<&str>) -> Vec<u8> {
    let body = json!({
        "amount": amount,
        "currency": "inr",
        "donorName": "Ravi",
        "donorEmail": "ravi@example.com",
        "referralCode": referral_code,
    });
    serde_json::to_vec(&body).unwrap()
}

#[actix_web::test]
async fn create_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/donations/order", order_body(50_000, Some("ASHA2024")), &[], configure_orders).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let res = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(res["orderId"], ORDER_ID);
    assert_eq!(res["amount"], 50_000);
    assert_eq!(res["currency"], "INR");
    assert_eq!(res["keyId"], KEY_ID);
    assert_eq!(res["donationId"].as_str().map(|s| s.len()), Some(24));
}

#[actix_web::test]
async fn create_order_zero_amount() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/donations/order", order_body(0, None), &[], configure_orders).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid request. Amount must be greater than zero"}"#);
}

#[actix_web::test]
async fn create_order_unknown_referral_code() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/donations/order", order_body(50_000, Some("NOPE")), &[], configure_orders).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Referral code 'NOPE' is not valid"}"#);
}

#[actix_web::test]
async fn create_order_malformed_body() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/donations/order", b"{\"amount\": ".to_vec(), &[], configure_orders).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"error":"Invalid request."#), "{body}");
}

#[actix_web::test]
async fn create_order_gateway_down() {
    let _ = env_logger::try_init().ok();
    fn offline_gateway() -> MockGateway {
        let mut gateway = MockGateway::new();
        gateway.expect_create_order().returning(|_, _, _| Err(GatewayError::RequestFailed("connection refused".into())));
        gateway.expect_clone().returning(offline_gateway);
        gateway
    }
    let mut ledger = MockLedger::new();
    ledger.expect_insert_donation().never();
    ledger.expect_clone().returning(order_ledger);
    let configure = move |cfg: &mut ServiceConfig| {
        let api = DonationFlowApi::new(ledger, offline_gateway());
        cfg.service(DonationOrderRoute::<MockLedger, MockGateway>::new())
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(CheckoutKey(KEY_ID.to_string())));
    };
    let (status, _) = post_request("/donations/order", order_body(50_000, None), &[], configure).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

//----------------------------------------------   Verification  ----------------------------------------------------
fn verify_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment().returning(|id| {
        Ok(GatewayPayment {
            id: id.clone(),
            order_id: Some(OrderId::from(ORDER_ID)),
            amount: MinorUnits::from(50_000),
            currency: "INR".into(),
            status: "captured".into(),
            method: Some("card".into()),
        })
    });
    gateway.expect_clone().returning(verify_gateway);
    gateway
}

fn configure_verify(ledger: MockLedger) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let guard = TransitionGuard::new(ledger, EventProducers::default());
        let api = VerificationApi::new(guard, verify_gateway(), key_secret());
        cfg.service(VerifyPaymentRoute::<MockLedger, MockGateway>::new()).app_data(web::Data::new(api));
    }
}

fn verify_body(order_id: &str, signature: &str) -> Vec<u8> {
    let body = json!({
        "orderId": order_id,
        "paymentId": PAYMENT_ID,
        "signature": signature,
        "donationId": DONATION_ID,
    });
    serde_json::to_vec(&body).unwrap()
}

#[actix_web::test]
async fn verify_payment() {
    let _ = env_logger::try_init().ok();
    let signature = payment_signature(ORDER_ID, PAYMENT_ID);
    let (status, body) =
        post_request("/donations/verify", verify_body(ORDER_ID, &signature), &[], configure_verify(pending_ledger())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let res = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(res["success"], true);
    assert_eq!(res["paymentId"], PAYMENT_ID);
    assert_eq!(res["amount"], 50_000);
    assert_eq!(res["currency"], "INR");
    assert_eq!(res["status"], "captured");
}

#[actix_web::test]
async fn verify_invalid_signature() {
    let _ = env_logger::try_init().ok();
    let signature = payment_signature(ORDER_ID, "pay_SomethingElse");
    let (status, body) =
        post_request("/donations/verify", verify_body(ORDER_ID, &signature), &[], configure_verify(pending_ledger())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Payment signature verification failed"}"#);
}

#[actix_web::test]
async fn verify_unknown_donation() {
    let _ = env_logger::try_init().ok();
    let signature = payment_signature(ORDER_ID, PAYMENT_ID);
    let (status, body) =
        post_request("/donations/verify", verify_body(ORDER_ID, &signature), &[], configure_verify(empty_ledger())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, format!(r#"{{"error":"The data was not found. No donation found for donation id {DONATION_ID}"}}"#));
}

#[actix_web::test]
async fn verify_order_mismatch() {
    let _ = env_logger::try_init().ok();
    let signature = payment_signature("order_SomeoneElse", PAYMENT_ID);
    fn untouched_ledger() -> MockLedger {
        let mut ledger = MockLedger::new();
        ledger.expect_fetch_donation().returning(|_| Ok(Some(donation(DonationStatus::Pending))));
        ledger.expect_transition_status().never();
        ledger.expect_clone().returning(untouched_ledger);
        ledger
    }
    let ledger = untouched_ledger();
    let (status, _) =
        post_request("/donations/verify", verify_body("order_SomeoneElse", &signature), &[], configure_verify(ledger))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn verify_failed_donation() {
    let _ = env_logger::try_init().ok();
    fn failed_ledger() -> MockLedger {
        let mut ledger = MockLedger::new();
        ledger.expect_fetch_donation().returning(|_| Ok(Some(donation(DonationStatus::Failed))));
        ledger.expect_transition_status().never();
        ledger.expect_clone().returning(failed_ledger);
        ledger
    }
    let signature = payment_signature(ORDER_ID, PAYMENT_ID);
    let (status, body) =
        post_request("/donations/verify", verify_body(ORDER_ID, &signature), &[], configure_verify(failed_ledger())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"The payment could not be confirmed. The donation is FAILED"}"#);
}
