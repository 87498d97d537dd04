use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    DonationFailedEvent,
    DonationRefundedEvent,
    DonationSucceededEvent,
    EventHandler,
    EventProducer,
    EventType,
    Handler,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub donation_succeeded_producer: Vec<EventProducer<DonationSucceededEvent>>,
    pub donation_failed_producer: Vec<EventProducer<DonationFailedEvent>>,
    pub donation_refunded_producer: Vec<EventProducer<DonationRefundedEvent>>,
}

impl EventProducers {
    /// Fans the event out to every subscriber of its kind.
    pub async fn publish(&self, event: EventType) {
        match event {
            EventType::DonationSucceeded(ev) => {
                for producer in &self.donation_succeeded_producer {
                    producer.publish_event(ev.clone()).await;
                }
            },
            EventType::DonationFailed(ev) => {
                for producer in &self.donation_failed_producer {
                    producer.publish_event(ev.clone()).await;
                }
            },
            EventType::DonationRefunded(ev) => {
                for producer in &self.donation_refunded_producer {
                    producer.publish_event(ev.clone()).await;
                }
            },
        }
    }
}

pub struct EventHandlers {
    pub on_donation_succeeded: Option<EventHandler<DonationSucceededEvent>>,
    pub on_donation_failed: Option<EventHandler<DonationFailedEvent>>,
    pub on_donation_refunded: Option<EventHandler<DonationRefundedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_donation_succeeded = hooks.on_donation_succeeded.map(|f| EventHandler::new(buffer_size, f));
        let on_donation_failed = hooks.on_donation_failed.map(|f| EventHandler::new(buffer_size, f));
        let on_donation_refunded = hooks.on_donation_refunded.map(|f| EventHandler::new(buffer_size, f));
        Self { on_donation_succeeded, on_donation_failed, on_donation_refunded }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_donation_succeeded {
            result.donation_succeeded_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_donation_failed {
            result.donation_failed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_donation_refunded {
            result.donation_refunded_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_donation_succeeded {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_donation_failed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_donation_refunded {
            tokio::spawn(handler.start_handler());
        }
    }
}

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_donation_succeeded: Option<Handler<DonationSucceededEvent>>,
    pub on_donation_failed: Option<Handler<DonationFailedEvent>>,
    pub on_donation_refunded: Option<Handler<DonationRefundedEvent>>,
}

impl EventHooks {
    pub fn on_donation_succeeded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DonationSucceededEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_donation_succeeded = Some(Arc::new(f));
        self
    }

    pub fn on_donation_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DonationFailedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_donation_failed = Some(Arc::new(f));
        self
    }

    pub fn on_donation_refunded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DonationRefundedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_donation_refunded = Some(Arc::new(f));
        self
    }
}
