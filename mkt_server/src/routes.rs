//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution.
use actix_web::{get, http::header, web, HttpRequest, HttpResponse, Responder};
use gateway_tools::{signature::CARD_SIGNATURE_HEADER, CardProcessor, RedirectCallback, RedirectGateway};
use log::*;
use mkt_engine::{
    db_types::{OrderNumber, PaymentMethod, Role},
    gateways::{ManualPaymentRequest, RedirectCallbackKind},
    order_objects::{NewOrderRequest, RescheduleRequest},
    payout_objects::{PayoutDecision, PayoutRequest},
    traits::MarketplaceDatabase,
    CardAdapter,
    GatewayConfig,
    LedgerApi,
    ManualAdapter,
    MarketplaceError,
    OrderFlowApi,
    PayoutApi,
    RedirectAdapter,
};

use crate::{
    auth::AuthClaims,
    config::ServerOptions,
    data_objects::{
        CheckoutParams,
        CompletePayoutParams,
        CouponParams,
        JsonResponse,
        NotesParams,
        OrderListQuery,
        PayoutListQuery,
        ProcessPayoutParams,
        ReasonParams,
        RefundParams,
        StatsQuery,
        VerifyPaymentParams,
    },
    errors::ServerError,
    helpers::get_remote_ip,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// Each bound becomes one type parameter on the route struct, in the order given, e.g. `CardIntentRoute<B, C>`.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds >],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds >] >,)+ );}
        paste::paste! { impl< $( [< T $bounds >],)+ > [<$name:camel Route>]< $( [< T $bounds >],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds >] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds>],)+>
        where
            $([<T $bounds>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds >],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds >] >,)+ );}
        paste::paste! { impl< $( [< T $bounds >],)+ > [<$name:camel Route>]< $( [< T $bounds >],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds >] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds>],)+>
        where
            $([<T $bounds>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds >], )+>);
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

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl MarketplaceDatabase where requires [Role::Customer]);
/// Books a service. The price is computed and frozen on the order at this point.
pub async fn create_order<B: MarketplaceDatabase>(
    claims: AuthClaims,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST create order for {}", claims.actor());
    let order = api.create_order(&claims.actor(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(JsonResponse::with_message("Order created", order)))
}

route!(list_orders => Get "/orders" impl MarketplaceDatabase where requires [Role::Customer, Role::Vendor, Role::Admin]);
/// Customers see their own orders, vendors the orders placed with them and admins everything.
pub async fn list_orders<B: MarketplaceDatabase>(
    claims: AuthClaims,
    query: web::Query<OrderListQuery>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for {}", claims.actor());
    let page = api.search_orders(&claims.actor(), query.filter(), query.pagination()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::data(page)))
}

route!(fetch_order => Get "/orders/{number}" impl MarketplaceDatabase where requires [Role::Customer, Role::Vendor, Role::Admin]);
pub async fn fetch_order<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(path.as_str());
    debug!("💻️ GET order {number} for {}", claims.actor());
    let order = api.fetch_order(&claims.actor(), &number).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::data(order)))
}

route!(accept_order => Post "/orders/{number}/accept" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn accept_order<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<String>,
    body: Option<web::Json<NotesParams>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(path.as_str());
    let notes = body.and_then(|b| b.into_inner().notes);
    let order = api.accept(&claims.actor(), &number, notes).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::with_message("Order accepted", order)))
}

route!(reject_order => Post "/orders/{number}/reject" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn reject_order<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<String>,
    body: Option<web::Json<ReasonParams>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(path.as_str());
    let reason = body.and_then(|b| b.into_inner().reason);
    let order = api.reject(&claims.actor(), &number, reason).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::with_message("Order rejected", order)))
}

route!(start_order => Post "/orders/{number}/start" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn start_order<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(path.as_str());
    let order = api.start(&claims.actor(), &number).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::with_message("Order started", order)))
}

route!(complete_order => Post "/orders/{number}/complete" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn complete_order<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<String>,
    body: Option<web::Json<NotesParams>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(path.as_str());
    let notes = body.and_then(|b| b.into_inner().notes);
    let order = api.complete(&claims.actor(), &number, notes).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::with_message("Order completed", order)))
}

route!(cancel_order => Post "/orders/{number}/cancel" impl MarketplaceDatabase where requires [Role::Customer, Role::Vendor, Role::Admin]);
pub async fn cancel_order<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<String>,
    body: Option<web::Json<ReasonParams>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(path.as_str());
    let reason = body.and_then(|b| b.into_inner().reason);
    let order = api.cancel(&claims.actor(), &number, reason).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::with_message("Order cancelled", order)))
}

route!(reschedule_order => Post "/orders/{number}/reschedule" impl MarketplaceDatabase where requires [Role::Customer, Role::Vendor]);
pub async fn reschedule_order<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<String>,
    body: web::Json<RescheduleRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(path.as_str());
    let order = api.reschedule(&claims.actor(), &number, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::with_message("Order rescheduled", order)))
}

route!(apply_coupon => Post "/orders/{number}/coupon" impl MarketplaceDatabase where requires [Role::Customer]);
pub async fn apply_coupon<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<String>,
    body: web::Json<CouponParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(path.as_str());
    let order = api.apply_coupon(&claims.actor(), &number, &body.code).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::with_message("Coupon applied", order)))
}

route!(preview_coupon => Get "/orders/{number}/coupon/{code}" impl MarketplaceDatabase where requires [Role::Customer]);
/// Checks a coupon against the order without redeeming it.
pub async fn preview_coupon<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<(String, String)>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (number, code) = path.into_inner();
    let preview = api.preview_coupon(&claims.actor(), &OrderNumber::from(number.as_str()), &code).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::data(preview)))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(card_intent => Post "/payments/card/intent" impl MarketplaceDatabase, CardProcessor where requires [Role::Customer]);
pub async fn card_intent<B: MarketplaceDatabase, C: CardProcessor>(
    claims: AuthClaims,
    body: web::Json<CheckoutParams>,
    adapter: web::Data<CardAdapter<B, C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST card intent for order {} by {}", body.order_number, claims.actor());
    let intent = adapter.create_intent(&claims.actor(), &body.order_number).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::data(intent)))
}

route!(redirect_init => Post "/payments/redirect/init" impl MarketplaceDatabase, RedirectGateway where requires [Role::Customer]);
pub async fn redirect_init<B: MarketplaceDatabase, G: RedirectGateway>(
    claims: AuthClaims,
    body: web::Json<CheckoutParams>,
    adapter: web::Data<RedirectAdapter<B, G>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST redirect checkout for order {} by {}", body.order_number, claims.actor());
    let init = adapter.init(&claims.actor(), &body.order_number).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::data(init)))
}

route!(manual_payment => Post "/payments/manual" impl MarketplaceDatabase where requires [Role::Customer]);
pub async fn manual_payment<B: MarketplaceDatabase>(
    claims: AuthClaims,
    body: web::Json<ManualPaymentRequest>,
    adapter: web::Data<ManualAdapter<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST manual payment for order {} by {}", body.order_number, claims.actor());
    let transaction = adapter.submit(&claims.actor(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(JsonResponse::with_message("Payment submitted for verification", transaction)))
}

route!(verify_manual_payment => Post "/payments/manual/{id}/verify" impl MarketplaceDatabase where requires [Role::Admin]);
pub async fn verify_manual_payment<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<i64>,
    body: web::Json<VerifyPaymentParams>,
    adapter: web::Data<ManualAdapter<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let VerifyPaymentParams { approved, notes } = body.into_inner();
    info!("💻️ {} {} manual payment #{id}", claims.actor(), if approved { "approves" } else { "rejects" });
    let result = adapter.verify(&claims.actor(), id, approved, notes).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::data(result)))
}

//----------------------------------------------   Transactions  ----------------------------------------------------
route!(refund_transaction => Post "/transactions/{id}/refund" impl MarketplaceDatabase, CardProcessor where requires [Role::Admin]);
/// Card payments are refunded at the processor first. Other methods are refunded off-platform and only recorded.
pub async fn refund_transaction<B: MarketplaceDatabase, C: CardProcessor>(
    claims: AuthClaims,
    path: web::Path<i64>,
    body: web::Json<RefundParams>,
    ledger: web::Data<LedgerApi<B>>,
    card: web::Data<CardAdapter<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let RefundParams { amount, reason } = body.into_inner();
    let actor = claims.actor();
    info!("💻️ {actor} requested a refund of {amount} on transaction #{id}");
    let transaction = ledger.fetch_transaction(&actor, id).await?;
    let payment = match transaction.payment_method {
        PaymentMethod::Card => card.refund(&actor, id, amount, reason).await?,
        _ => ledger.refund(&actor, id, amount, reason).await?.payment,
    };
    Ok(HttpResponse::Ok().json(JsonResponse::with_message("Refund recorded", payment)))
}

route!(transaction_stats => Get "/transactions/stats" impl MarketplaceDatabase where requires [Role::Admin]);
pub async fn transaction_stats<B: MarketplaceDatabase>(
    claims: AuthClaims,
    query: web::Query<StatsQuery>,
    ledger: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let stats = ledger.transaction_stats(&claims.actor(), query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::data(stats)))
}

route!(order_transactions => Get "/transactions/order/{number}" impl MarketplaceDatabase where requires [Role::Customer, Role::Vendor, Role::Admin]);
pub async fn order_transactions<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<String>,
    ledger: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(path.as_str());
    let transactions = ledger.transactions_for_order(&claims.actor(), &number).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::data(transactions)))
}

//----------------------------------------------   Payouts  ----------------------------------------------------
route!(request_payout => Post "/payouts" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn request_payout<B: MarketplaceDatabase>(
    claims: AuthClaims,
    body: web::Json<PayoutRequest>,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payout = api.request(&claims.actor(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(JsonResponse::with_message("Payout requested", payout)))
}

route!(list_payouts => Get "/payouts" impl MarketplaceDatabase where requires [Role::Vendor, Role::Admin]);
pub async fn list_payouts<B: MarketplaceDatabase>(
    claims: AuthClaims,
    query: web::Query<PayoutListQuery>,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payouts = api.list(&claims.actor(), query.status).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::data(payouts)))
}

route!(payout_balance => Get "/payouts/balance" impl MarketplaceDatabase where requires [Role::Vendor]);
/// What the vendor could claim with a payout request right now.
pub async fn payout_balance<B: MarketplaceDatabase>(
    claims: AuthClaims,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let balance = api.available_balance(&claims.actor()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::data(balance)))
}

route!(process_payout => Post "/payouts/{id}/process" impl MarketplaceDatabase where requires [Role::Admin]);
pub async fn process_payout<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<i64>,
    body: web::Json<ProcessPayoutParams>,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ProcessPayoutParams { decision, notes } = body.into_inner();
    let payout = api.process(&claims.actor(), path.into_inner(), decision, notes).await?;
    let message = match decision {
        PayoutDecision::Approve => "Payout approved",
        PayoutDecision::Reject => "Payout rejected",
    };
    Ok(HttpResponse::Ok().json(JsonResponse::with_message(message, payout)))
}

route!(complete_payout => Post "/payouts/{id}/complete" impl MarketplaceDatabase where requires [Role::Admin]);
pub async fn complete_payout<B: MarketplaceDatabase>(
    claims: AuthClaims,
    path: web::Path<i64>,
    body: web::Json<CompletePayoutParams>,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payout = api.complete(&claims.actor(), path.into_inner(), body.into_inner().reference).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::with_message("Payout completed", payout)))
}

//----------------------------------------------   Gateway callbacks  ----------------------------------------------
route!(card_webhook => Post "/webhooks/card" impl MarketplaceDatabase, CardProcessor);
/// Signed deliveries from the card processor. The raw body is needed for the signature check.
pub async fn card_webhook<B: MarketplaceDatabase, C: CardProcessor>(
    req: HttpRequest,
    body: web::Bytes,
    adapter: web::Data<CardAdapter<B, C>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received card webhook");
    let signature = req
        .headers()
        .get(CARD_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| MarketplaceError::validation("Missing webhook signature"))?;
    let outcome = adapter.handle_webhook(body.as_ref(), signature).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::data(outcome)))
}

route!(redirect_callback => Post "/payments/redirect/{kind}" impl MarketplaceDatabase, RedirectGateway);
/// Browser redirects (`success`, `fail`, `cancel`) and the server-to-server IPN from the redirect gateway.
///
/// Browsers are always answered with a 303 to the client's result page, even when the callback could not be
/// processed; the IPN settles the payment regardless. The IPN gets a JSON answer and is subject to the IP whitelist.
pub async fn redirect_callback<B: MarketplaceDatabase, G: RedirectGateway>(
    req: HttpRequest,
    path: web::Path<RedirectCallbackKind>,
    form: web::Form<RedirectCallback>,
    adapter: web::Data<RedirectAdapter<B, G>>,
    gateway: web::Data<GatewayConfig>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let kind = path.into_inner();
    let callback = form.into_inner();
    if kind == RedirectCallbackKind::Ipn {
        let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
        if !options.ipn_allowed(peer) {
            warn!("💻️ Rejected an IPN for {} from {peer:?}", callback.tran_id);
            return Err(ServerError::ForbiddenPeer);
        }
        info!("💻️ IPN received for {}", callback.tran_id);
        let outcome = adapter.handle_callback(kind, callback).await?;
        return Ok(HttpResponse::Ok().json(JsonResponse::data(outcome.result)));
    }
    debug!("💻️ Redirect {kind} callback for {}", callback.tran_id);
    let tran_id = callback.tran_id.clone();
    let location = match adapter.handle_callback(kind, callback).await {
        Ok(outcome) => outcome.redirect_url,
        Err(e) => {
            warn!("💻️ Could not process the {kind} callback for {tran_id}. {e}");
            let outcome = if kind == RedirectCallbackKind::Cancel { "cancel" } else { "fail" };
            gateway.client_result_url(outcome, "", &tran_id)
        },
    };
    Ok(HttpResponse::SeeOther().insert_header((header::LOCATION, location)).finish())
}
