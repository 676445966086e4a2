//! Customer notification sink trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::SagaError;

/// Terminal-state event delivered to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notification_type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// The order was fulfilled.
    OrderConfirmed {
        order_id: OrderId,
        amount: Money,
        transaction_ref: Option<String>,
    },

    /// The payment was declined or could not be captured.
    PaymentFailed { order_id: OrderId, amount: Money },

    /// A line item could not be reserved; the payment is being refunded.
    StockInsufficient {
        order_id: OrderId,
        product_id: ProductId,
    },

    /// The saga aborted on an infrastructure fault.
    SystemError { order_id: OrderId, error: String },
}

impl NotificationEvent {
    /// The order this event concerns.
    pub fn order_id(&self) -> OrderId {
        match self {
            NotificationEvent::OrderConfirmed { order_id, .. }
            | NotificationEvent::PaymentFailed { order_id, .. }
            | NotificationEvent::StockInsufficient { order_id, .. }
            | NotificationEvent::SystemError { order_id, .. } => *order_id,
        }
    }
}

/// Outcome of a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The sink accepted the event.
    Delivered { message_id: String },

    /// The sink was unreachable. Notification is fire-and-forget, so the
    /// caller logs and moves on rather than retrying.
    Unavailable,
}

/// Interface to the customer notification capability.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one event. Must not block the saga on downstream outages.
    async fn notify(&self, event: NotificationEvent) -> Result<DeliveryOutcome, SagaError>;
}

#[derive(Debug, Default)]
struct InMemorySinkState {
    events: Vec<NotificationEvent>,
    next_id: u32,
    unavailable: bool,
}

/// In-memory notification sink that records delivered events for assertions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationSink {
    state: Arc<RwLock<InMemorySinkState>>,
}

impl InMemoryNotificationSink {
    /// Creates a new in-memory notification sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures deliveries to return `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable = unavailable;
    }

    /// Events delivered so far, in delivery order.
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.state.read().unwrap().events.clone()
    }

    /// Number of events delivered.
    pub fn delivered_count(&self) -> usize {
        self.state.read().unwrap().events.len()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn notify(&self, event: NotificationEvent) -> Result<DeliveryOutcome, SagaError> {
        let mut state = self.state.write().unwrap();

        if state.unavailable {
            return Ok(DeliveryOutcome::Unavailable);
        }

        state.next_id += 1;
        let message_id = format!("MSG-{:04}", state.next_id);
        state.events.push(event);

        Ok(DeliveryOutcome::Delivered { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_delivered_events() {
        let sink = InMemoryNotificationSink::new();
        let order_id = OrderId::new();

        let outcome = sink
            .notify(NotificationEvent::PaymentFailed {
                order_id,
                amount: Money::from_cents(2500),
            })
            .await
            .unwrap();

        assert!(matches!(outcome, DeliveryOutcome::Delivered { .. }));
        assert_eq!(sink.delivered_count(), 1);
        assert_eq!(sink.events()[0].order_id(), order_id);
    }

    #[tokio::test]
    async fn unavailable_records_nothing() {
        let sink = InMemoryNotificationSink::new();
        sink.set_unavailable(true);

        let outcome = sink
            .notify(NotificationEvent::SystemError {
                order_id: OrderId::new(),
                error: "boom".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Unavailable);
        assert_eq!(sink.delivered_count(), 0);
    }

    #[test]
    fn event_wire_shape() {
        let event = NotificationEvent::StockInsufficient {
            order_id: OrderId::new(),
            product_id: ProductId::new("P-42"),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["notification_type"], "stock_insufficient");
        assert_eq!(json["product_id"], "P-42");
    }
}
