use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderEvent, PaymentEvent, PayoutEvent};

type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The publishing side handed to the engine APIs. Cloning is cheap.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_producer: Vec<EventProducer<OrderEvent>>,
    pub payment_producer: Vec<EventProducer<PaymentEvent>>,
    pub payout_producer: Vec<EventProducer<PayoutEvent>>,
}

impl EventProducers {
    pub async fn publish_order_event(&self, event: OrderEvent) {
        for producer in &self.order_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payment_event(&self, event: PaymentEvent) {
        for producer in &self.payment_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payout_event(&self, event: PayoutEvent) {
        for producer in &self.payout_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_event: Option<EventHandler<OrderEvent>>,
    pub on_payment_event: Option<EventHandler<PaymentEvent>>,
    pub on_payout_event: Option<EventHandler<PayoutEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_event = hooks.on_order_event.map(|f| EventHandler::new("order", buffer_size, f));
        let on_payment_event = hooks.on_payment_event.map(|f| EventHandler::new("payment", buffer_size, f));
        let on_payout_event = hooks.on_payout_event.map(|f| EventHandler::new("payout", buffer_size, f));
        Self { on_order_event, on_payment_event, on_payout_event }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_event {
            result.order_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_event {
            result.payment_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payout_event {
            result.payout_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_event {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payment_event {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payout_event {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_event: Option<Handler<OrderEvent>>,
    pub on_payment_event: Option<Handler<PaymentEvent>>,
    pub on_payout_event: Option<Handler<PayoutEvent>>,
}

impl EventHooks {
    pub fn on_order_event<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderEvent) -> BoxedFuture) + Send + Sync + 'static {
        self.on_order_event = Some(Arc::new(f));
        self
    }

    pub fn on_payment_event<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentEvent) -> BoxedFuture) + Send + Sync + 'static {
        self.on_payment_event = Some(Arc::new(f));
        self
    }

    pub fn on_payout_event<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PayoutEvent) -> BoxedFuture) + Send + Sync + 'static {
        self.on_payout_event = Some(Arc::new(f));
        self
    }
}
