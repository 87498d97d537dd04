//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Every handler awaits storage or the payment gateway. None of them may block the worker thread, since each worker
//! processes its requests sequentially.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use donation_engine::{
    DonationFlowApi,
    DonationOrderRequest,
    DonationStore,
    PaymentGatewayClient,
    PaymentVerificationRequest,
    VerificationApi,
    WebhookApi,
};
use log::*;

use crate::{
    config::ServerOptions,
    data_objects::{CheckoutKey, DonationOrderResponse},
    errors::ServerError,
    helpers::get_remote_ip,
};

pub const RAZORPAY_SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Donations  ----------------------------------------------------
route!(donation_order => Post "/donations/order" impl DonationStore, PaymentGatewayClient);
/// Route handler for starting a donation.
///
/// Creates a gateway order and binds it to a new `PENDING` donation. The response carries everything the checkout
/// widget needs: the donation and order ids, the amount in minor units, the currency and the public key id.
pub async fn donation_order<B, G>(
    body: web::Json<DonationOrderRequest>,
    api: web::Data<DonationFlowApi<B, G>>,
    key: web::Data<CheckoutKey>,
) -> Result<HttpResponse, ServerError>
where
    B: DonationStore,
    G: PaymentGatewayClient,
{
    let request = body.into_inner();
    trace!("💻️ Received donation order request for {} {}", request.amount, request.currency);
    let order = api.create_donation_order(request).await?;
    debug!("💻️ Donation {} bound to order {}", order.donation.id, order.order.id);
    Ok(HttpResponse::Ok().json(DonationOrderResponse::new(order, &key.0)))
}

route!(verify_payment => Post "/donations/verify" impl DonationStore, PaymentGatewayClient);
/// Route handler for the donor's browser relaying the checkout widget's payment confirmation.
///
/// * 200 - the donation is `SUCCESS`. Repeating the call returns the same result.
/// * 400 - missing fields, a bad signature or an order id that does not belong to the donation.
/// * 404 - no such donation.
/// * 409 - the signature was good but the donation could not be marked successful (e.g. it had already failed).
pub async fn verify_payment<B, G>(
    body: web::Json<PaymentVerificationRequest>,
    api: web::Data<VerificationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: DonationStore,
    G: PaymentGatewayClient,
{
    let request = body.into_inner();
    trace!("💻️ Received payment verification for donation {}", request.donation_id);
    let result = api.verify_payment(request).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(razorpay_webhook => Post "/webhook" impl DonationStore);
/// Route handler for Razorpay webhook calls.
///
/// The raw body is checked against the `X-Razorpay-Signature` header before anything else happens. A missing
/// signature is a 400 and one that does not verify is a 401.
///
/// Business outcomes (unknown orders, repeats, amount mismatches) are reported in a 200 response body so that the
/// gateway does not retry them. A malformed envelope is a 400. Storage failures are a 500, which the gateway will retry.
pub async fn razorpay_webhook<B>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<WebhookApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: DonationStore,
{
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    info!("💻️ Received Razorpay webhook call from {}", peer.map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".into()));
    let signature = req.headers().get(RAZORPAY_SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let outcome = api.handle(body.as_ref(), signature).await?;
    debug!("💻️ Webhook outcome: {}", outcome.message);
    Ok(HttpResponse::Ok().json(outcome))
}
