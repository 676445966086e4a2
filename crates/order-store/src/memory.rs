use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;
use domain::{Order, OrderState, PaymentRecord};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::OrderStore;

/// In-memory order store implementation for testing.
///
/// Provides the same conditional-update semantics as the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.order_id()) {
            return Err(StoreError::DuplicateOrder(order.order_id()));
        }
        orders.insert(order.order_id(), order);
        Ok(())
    }

    async fn load(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn transition(&self, order_id: OrderId, from: OrderState, to: OrderState) -> Result<()> {
        if !from.can_transition_to(to) {
            return Err(StoreError::InvalidState(format!(
                "illegal transition {from} -> {to}"
            )));
        }

        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;

        if order.state() != from {
            return Err(StoreError::StaleState {
                order_id,
                expected: from,
                actual: order.state(),
            });
        }

        order.set_state(to, Utc::now());
        Ok(())
    }

    async fn record_payment(&self, order_id: OrderId, payment: PaymentRecord) -> Result<()> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        order.set_payment(payment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerId, Money, ProductId};
    use domain::{OrderTrigger, TriggerItem};

    fn sample_order() -> Order {
        OrderTrigger {
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
            total_amount: Money::from_cents(2000),
            items: vec![TriggerItem {
                product_id: ProductId::new("P1"),
                quantity: 2,
                price: Money::from_cents(1000),
            }],
        }
        .into_order()
        .unwrap()
    }

    #[tokio::test]
    async fn create_and_load() {
        let store = InMemoryOrderStore::new();
        let order = sample_order();
        let order_id = order.order_id();

        store.create(order).await.unwrap();

        let loaded = store.load(order_id).await.unwrap().unwrap();
        assert_eq!(loaded.order_id(), order_id);
        assert_eq!(loaded.state(), OrderState::Created);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_id() {
        let store = InMemoryOrderStore::new();
        let order = sample_order();

        store.create(order.clone()).await.unwrap();
        let result = store.create(order).await;
        assert!(matches!(result, Err(StoreError::DuplicateOrder(_))));
    }

    #[tokio::test]
    async fn load_missing_order_returns_none() {
        let store = InMemoryOrderStore::new();
        assert!(store.load(OrderId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transition_applies_when_state_matches() {
        let store = InMemoryOrderStore::new();
        let order = sample_order();
        let order_id = order.order_id();
        store.create(order).await.unwrap();

        store
            .transition(order_id, OrderState::Created, OrderState::PaymentPending)
            .await
            .unwrap();

        let loaded = store.load(order_id).await.unwrap().unwrap();
        assert_eq!(loaded.state(), OrderState::PaymentPending);
    }

    #[tokio::test]
    async fn transition_rejects_stale_state() {
        let store = InMemoryOrderStore::new();
        let order = sample_order();
        let order_id = order.order_id();
        store.create(order).await.unwrap();

        store
            .transition(order_id, OrderState::Created, OrderState::PaymentPending)
            .await
            .unwrap();

        // A second worker still believing the order is Created loses.
        let result = store
            .transition(order_id, OrderState::Created, OrderState::PaymentPending)
            .await;

        assert!(matches!(
            result,
            Err(StoreError::StaleState {
                expected: OrderState::Created,
                actual: OrderState::PaymentPending,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn transition_rejects_illegal_edge() {
        let store = InMemoryOrderStore::new();
        let order = sample_order();
        let order_id = order.order_id();
        store.create(order).await.unwrap();

        // Created -> Confirmed skips the whole payment/inventory path.
        let result = store
            .transition(order_id, OrderState::Created, OrderState::Confirmed)
            .await;
        assert!(matches!(result, Err(StoreError::InvalidState(_))));

        let loaded = store.load(order_id).await.unwrap().unwrap();
        assert_eq!(loaded.state(), OrderState::Created);
    }

    #[tokio::test]
    async fn transition_on_missing_order_fails() {
        let store = InMemoryOrderStore::new();
        let result = store
            .transition(OrderId::new(), OrderState::Created, OrderState::PaymentPending)
            .await;
        assert!(matches!(result, Err(StoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn record_payment_persists_transaction_reference() {
        let store = InMemoryOrderStore::new();
        let order = sample_order();
        let order_id = order.order_id();
        store.create(order).await.unwrap();

        store
            .record_payment(
                order_id,
                PaymentRecord {
                    transaction_ref: "TXN-0001".to_string(),
                    amount: Money::from_cents(2000),
                    captured_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let loaded = store.load(order_id).await.unwrap().unwrap();
        assert_eq!(loaded.payment().unwrap().transaction_ref, "TXN-0001");
    }
}
