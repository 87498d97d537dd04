use donation_engine::{
    db_types::{AccountId, DonationLookup, DonationStatus, MinorUnits, NewReferralCode, ProgramId, ReferralCodeId},
    AggregateStore,
    DonationFlowApi,
    DonationLedger,
    DonationOrderRequest,
    ReconciliationError,
    ReferralApi,
    SqliteDatabase,
    WebhookApi,
};
use support::{prepare_env::*, *};

mod support;

async fn setup() -> (SqliteDatabase, StubGateway) {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    seed_aggregates(&db).await;
    db.insert_referral_code(
        NewReferralCode::new(ReferralCodeId::from("ref_retired"), "RETIRED1", AccountId::from("coordinator_old")).inactive(),
    )
    .await
    .expect("Error inserting referral code");
    (db, StubGateway::default())
}

fn request(referral_code: Option<&str>) -> DonationOrderRequest {
    DonationOrderRequest {
        amount: MinorUnits::from(50_000),
        currency: "inr".into(),
        donor_name: "Meera".into(),
        donor_email: Some("meera@example.com".into()),
        donor_phone: None,
        program_id: Some(ProgramId::from(PROGRAM)),
        referral_code: referral_code.map(String::from),
    }
}

#[tokio::test]
async fn create_order_binds_pending_donation() {
    let (db, gateway) = setup().await;
    let api = DonationFlowApi::new(db.clone(), gateway.clone());
    let order = api.create_donation_order(request(Some(REFERRAL_CODE))).await.expect("Order should be created");
    assert_eq!(gateway.orders_created(), 1);
    assert_eq!(order.order.receipt.as_deref(), Some(order.donation.id.as_str()));
    assert_eq!(order.donation.gateway_order_id, order.order.id);
    assert_eq!(order.donation.status, DonationStatus::Pending);
    assert_eq!(order.donation.currency, "INR");
    assert_eq!(order.donation.program_id, Some(ProgramId::from(PROGRAM)));
    assert_eq!(order.donation.referral_code_id, Some(ReferralCodeId::from(REFERRAL)));
    assert_eq!(order.donation.referral_owner_id, Some(AccountId::from("coordinator_asha")));
    assert!(order.donation.id.is_valid());
    let stored = db.fetch_donation(&DonationLookup::ByOrderId(order.order.id.clone())).await.unwrap();
    assert_eq!(stored, Some(order.donation));
    tear_down(db).await;
}

#[tokio::test]
async fn new_order_reconciles_straight_away() {
    let (db, gateway) = setup().await;
    let api = DonationFlowApi::new(db.clone(), gateway);
    let webhooks = WebhookApi::new(guard(&db), webhook_secret());
    let order = api.create_donation_order(request(Some(REFERRAL_CODE))).await.expect("Order should be created");
    // The capture arrives before anything else touches the database
    let body = payment_event("payment.captured", "pay_fresh001", order.order.id.as_str(), 50_000);
    let outcome = webhooks.handle(&body, Some(&webhook_signature(&body))).await.expect("Webhook should be accepted");
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.processed, Some(true));
    assert_eq!(outcome.donation_id, Some(order.donation.id.clone()));
    let stored = db.fetch_donation(&DonationLookup::ById(order.donation.id)).await.unwrap().unwrap();
    assert_eq!(stored.status, DonationStatus::Success);
    let program = db.fetch_program(&ProgramId::from(PROGRAM)).await.unwrap().unwrap();
    assert_eq!(program.raised_amount.value(), 50_000);
    assert_eq!(program.donation_count, 1);
    let code = db.fetch_referral_code(&ReferralCodeId::from(REFERRAL)).await.unwrap().unwrap();
    assert_eq!(code.total_amount.value(), 50_000);
    assert_eq!(code.total_donations, 1);
    tear_down(db).await;
}

#[tokio::test]
async fn referral_codes_resolve_exactly() {
    let (db, _) = setup().await;
    let api = ReferralApi::new(db.clone());
    let resolved = api.resolve(REFERRAL_CODE).await.unwrap().expect("Active code should resolve");
    assert_eq!(resolved.referral_code_id, ReferralCodeId::from(REFERRAL));
    assert!(api.resolve(&REFERRAL_CODE.to_lowercase()).await.unwrap().is_none());
    assert!(api.resolve("RETIRED1").await.unwrap().is_none());
    assert!(api.resolve("NOPE").await.unwrap().is_none());
    assert!(api.resolve("").await.unwrap().is_none());
    tear_down(db).await;
}

#[tokio::test]
async fn unknown_referral_code_is_rejected() {
    let (db, gateway) = setup().await;
    let api = DonationFlowApi::new(db.clone(), gateway.clone());
    let err = api.create_donation_order(request(Some("RETIRED1"))).await.expect_err("Inactive code must be rejected");
    assert!(matches!(err, ReconciliationError::InvalidReferralCode(_)), "{err}");
    assert_eq!(gateway.orders_created(), 0);
    tear_down(db).await;
}

#[tokio::test]
async fn unknown_program_is_rejected() {
    let (db, gateway) = setup().await;
    let api = DonationFlowApi::new(db.clone(), gateway.clone());
    let mut req = request(None);
    req.program_id = Some(ProgramId::from("prog_missing"));
    let err = api.create_donation_order(req).await.expect_err("Unknown program must be rejected");
    assert!(matches!(err, ReconciliationError::ProgramNotFound(_)), "{err}");
    assert_eq!(gateway.orders_created(), 0);
    tear_down(db).await;
}

#[tokio::test]
async fn gateway_failure_stores_nothing() {
    let (db, gateway) = setup().await;
    gateway.go_offline();
    let api = DonationFlowApi::new(db.clone(), gateway);
    let err = api.create_donation_order(request(None)).await.expect_err("Gateway is offline");
    assert!(matches!(err, ReconciliationError::GatewayError(_)), "{err}");
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM donations").fetch_one(db.pool()).await.unwrap();
    assert_eq!(count, 0);
    tear_down(db).await;
}

#[tokio::test]
async fn order_ids_bind_once() {
    let (db, _) = setup().await;
    seed_donation(&db, "order_once001", 10_000).await;
    let dup = donation_engine::db_types::NewDonation::new(
        donation_engine::db_types::DonationId::random(),
        MinorUnits::from(10_000),
        "INR",
        "order_once001".into(),
        "Imposter",
    );
    let err = db.insert_donation(dup).await.expect_err("Order ids are unique");
    assert!(matches!(err, donation_engine::LedgerError::OrderAlreadyBound(_)), "{err}");
    // The order id itself can never be rewritten
    let result = sqlx::query("UPDATE donations SET gateway_order_id = 'order_other' WHERE gateway_order_id = 'order_once001'")
        .execute(db.pool())
        .await;
    assert!(result.is_err());
    tear_down(db).await;
}
