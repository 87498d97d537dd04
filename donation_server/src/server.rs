use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use donation_engine::{
    events::EventProducers,
    DonationFlowApi,
    SqliteDatabase,
    TransitionGuard,
    VerificationApi,
    WebhookApi,
};
use log::*;
use razorpay_tools::RazorpayApi;

use crate::{
    config::{ServerConfig, ServerOptions},
    data_objects::CheckoutKey,
    errors::ServerError,
    integrations::{audit::create_audit_event_handlers, razorpay::RazorpayGateway},
    repair_worker::start_repair_worker,
    routes::{health, DonationOrderRoute, RazorpayWebhookRoute, VerifyPaymentRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🗃️ Database at {} is ready", db.url());
    let api = RazorpayApi::new(config.razorpay.api.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = RazorpayGateway::new(api);
    let handlers = create_audit_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    match config.repair_interval {
        Some(interval) => {
            // The worker runs until the process exits
            let _handle = start_repair_worker(db.clone(), interval);
        },
        None => warn!("🩹️ Aggregate repair worker is disabled"),
    }
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: RazorpayGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let bind_addr = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let guard = TransitionGuard::new(db.clone(), producers.clone());
        let order_api = DonationFlowApi::new(db.clone(), gateway.clone());
        let verification_api =
            VerificationApi::new(guard.clone(), gateway.clone(), config.razorpay.api.key_secret.clone());
        let webhook_api = WebhookApi::new(guard, config.razorpay.webhook_secret.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("dpg::access_log"))
            .app_data(json_config())
            .app_data(web::Data::new(order_api))
            .app_data(web::Data::new(verification_api))
            .app_data(web::Data::new(webhook_api))
            .app_data(web::Data::new(CheckoutKey(gateway.key_id().to_string())))
            .app_data(web::Data::new(ServerOptions::from_config(&config)));
        let api_scope = web::scope("/api")
            .service(DonationOrderRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase, RazorpayGateway>::new());
        let razorpay_scope = web::scope("/razorpay").service(RazorpayWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(razorpay_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind(bind_addr)?
    .run();
    Ok(srv)
}

/// Reports JSON body errors in the same `{"error": ...}` shape as every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}
