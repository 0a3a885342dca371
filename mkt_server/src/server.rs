use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use gateway_tools::{CardProcessorApi, RedirectGatewayApi};
use log::*;
use mkt_engine::{
    events::{EventHandlers, EventProducers},
    notifications::{LogNotifier, NotificationDispatcher, Notifier},
    CardAdapter,
    LedgerApi,
    ManualAdapter,
    OrderFlowApi,
    PayoutApi,
    RedirectAdapter,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::HttpEmailNotifier,
    middleware::IdentityMiddlewareFactory,
    routes::{
        health,
        AcceptOrderRoute,
        ApplyCouponRoute,
        CancelOrderRoute,
        CardIntentRoute,
        CardWebhookRoute,
        CompleteOrderRoute,
        CompletePayoutRoute,
        CreateOrderRoute,
        FetchOrderRoute,
        ListOrdersRoute,
        ListPayoutsRoute,
        ManualPaymentRoute,
        OrderTransactionsRoute,
        PayoutBalanceRoute,
        PreviewCouponRoute,
        ProcessPayoutRoute,
        RedirectCallbackRoute,
        RedirectInitRoute,
        RefundTransactionRoute,
        RejectOrderRoute,
        RequestPayoutRoute,
        RescheduleOrderRoute,
        StartOrderRoute,
        TransactionStatsRoute,
        VerifyManualPaymentRoute,
    },
    stale_payment_worker::start_stale_payment_worker,
};

const EVENT_BUFFER_SIZE: usize = 128;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let producers = start_event_handlers(&config).await;
    let card = CardProcessorApi::new(config.card.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let redirect =
        RedirectGatewayApi::new(config.redirect.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let ledger = LedgerApi::new(db.clone(), producers.clone(), config.gateway.commission_rate);
    let _worker = start_stale_payment_worker(ledger, config.stale_payment_timeout);
    let srv = create_server_instance(config, db, producers, card, redirect)?;
    srv.await.map_err(|e| ServerError::BackendError(e.to_string()))
}

/// Wires the notification dispatcher into the engine's event channels and returns the producers the APIs publish to.
async fn start_event_handlers(config: &ServerConfig) -> EventProducers {
    let notifier: Arc<dyn Notifier> = match HttpEmailNotifier::new(&config.email) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            info!("📬️ Email notifications will only be logged. {e}");
            Arc::new(LogNotifier)
        },
    };
    let dispatcher = NotificationDispatcher::new(notifier);
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, dispatcher.hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    producers
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    card: CardProcessorApi,
    redirect: RedirectGatewayApi,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let ledger_api = LedgerApi::new(db.clone(), producers.clone(), config.gateway.commission_rate);
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone(), config.pricing.clone());
        let payouts_api = PayoutApi::new(db.clone(), producers.clone());
        let card_adapter = CardAdapter::new(ledger_api.clone(), card.clone());
        let redirect_adapter = RedirectAdapter::new(ledger_api.clone(), redirect.clone(), config.gateway.clone());
        let manual_adapter = ManualAdapter::new(ledger_api.clone());
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(ListOrdersRoute::<SqliteDatabase>::new())
            .service(FetchOrderRoute::<SqliteDatabase>::new())
            .service(AcceptOrderRoute::<SqliteDatabase>::new())
            .service(RejectOrderRoute::<SqliteDatabase>::new())
            .service(StartOrderRoute::<SqliteDatabase>::new())
            .service(CompleteOrderRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(RescheduleOrderRoute::<SqliteDatabase>::new())
            .service(ApplyCouponRoute::<SqliteDatabase>::new())
            .service(PreviewCouponRoute::<SqliteDatabase>::new())
            .service(CardIntentRoute::<SqliteDatabase, CardProcessorApi>::new())
            .service(RedirectInitRoute::<SqliteDatabase, RedirectGatewayApi>::new())
            .service(ManualPaymentRoute::<SqliteDatabase>::new())
            .service(VerifyManualPaymentRoute::<SqliteDatabase>::new())
            .service(RefundTransactionRoute::<SqliteDatabase, CardProcessorApi>::new())
            .service(TransactionStatsRoute::<SqliteDatabase>::new())
            .service(OrderTransactionsRoute::<SqliteDatabase>::new())
            .service(RequestPayoutRoute::<SqliteDatabase>::new())
            .service(ListPayoutsRoute::<SqliteDatabase>::new())
            .service(PayoutBalanceRoute::<SqliteDatabase>::new())
            .service(ProcessPayoutRoute::<SqliteDatabase>::new())
            .service(CompletePayoutRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(IdentityMiddlewareFactory::new(config.trust_identity_headers))
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mkt::access_log"))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(ledger_api))
            .app_data(web::Data::new(payouts_api))
            .app_data(web::Data::new(card_adapter))
            .app_data(web::Data::new(redirect_adapter))
            .app_data(web::Data::new(manual_adapter))
            .app_data(web::Data::new(config.gateway.clone()))
            .app_data(web::Data::new(options.clone()))
            .service(health)
            .service(api_scope)
            .service(CardWebhookRoute::<SqliteDatabase, CardProcessorApi>::new())
            .service(RedirectCallbackRoute::<SqliteDatabase, RedirectGatewayApi>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Malformed request bodies get the same error envelope as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}
