//! Order records and the admission trigger message.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::state::OrderState;

/// A line item in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product identifier.
    pub product_id: ProductId,

    /// Quantity ordered (at least 1).
    pub quantity: u32,

    /// Price per unit.
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this item (quantity * unit_price).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// The durable record of a captured payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Transaction reference assigned by the payment processor.
    pub transaction_ref: String,

    /// Amount captured.
    pub amount: Money,

    /// When the capture was acknowledged.
    pub captured_at: DateTime<Utc>,
}

/// Trigger message consumed by the saga coordinator.
///
/// Produced by the order admission surface:
/// `{order_id, customer_id, total_amount, items}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTrigger {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub total_amount: Money,
    pub items: Vec<TriggerItem>,
}

/// A line item as carried on the trigger message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

impl OrderTrigger {
    /// Validates the trigger and builds an `Order` in `Created` state.
    ///
    /// Rejects empty orders, zero quantities, negative prices, and a
    /// declared total that disagrees with the line items. The order total
    /// is computed here, once, and never recomputed from another source.
    pub fn into_order(self) -> Result<Order, DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        let mut items = Vec::with_capacity(self.items.len());
        let mut computed = Money::zero();
        for item in self.items {
            if item.quantity == 0 {
                return Err(DomainError::ZeroQuantity(item.product_id));
            }
            if item.price.is_negative() {
                return Err(DomainError::NegativePrice {
                    product_id: item.product_id,
                    price: item.price,
                });
            }
            let item = OrderItem::new(item.product_id, item.quantity, item.price);
            computed += item.line_total();
            items.push(item);
        }

        if computed != self.total_amount {
            return Err(DomainError::TotalMismatch {
                declared: self.total_amount,
                computed,
            });
        }

        let now = Utc::now();
        Ok(Order {
            order_id: self.order_id,
            customer_id: self.customer_id,
            items,
            total: computed,
            state: OrderState::Created,
            payment: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A persisted order and its current saga state.
///
/// Mutated only by the coordinator advancing or compensating its state;
/// the core never deletes orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    order_id: OrderId,
    customer_id: CustomerId,
    items: Vec<OrderItem>,
    total: Money,
    state: OrderState,
    payment: Option<PaymentRecord>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Reconstitutes an order from persisted parts.
    ///
    /// Used by store implementations; admission goes through
    /// [`OrderTrigger::into_order`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        order_id: OrderId,
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        total: Money,
        state: OrderState,
        payment: Option<PaymentRecord>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            customer_id,
            items,
            total,
            state,
            payment,
            created_at,
            updated_at,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// The computed total (Σ quantity × unit price), fixed at admission.
    pub fn total(&self) -> Money {
        self.total
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    /// The captured payment, if the payment step has completed.
    pub fn payment(&self) -> Option<&PaymentRecord> {
        self.payment.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the last state transition.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a state transition. Store implementations call this after
    /// the conditional-update check has passed.
    pub fn set_state(&mut self, state: OrderState, at: DateTime<Utc>) {
        self.state = state;
        self.updated_at = at;
    }

    /// Attaches the durable payment record.
    pub fn set_payment(&mut self, payment: PaymentRecord) {
        self.payment = Some(payment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(items: Vec<TriggerItem>, total: Money) -> OrderTrigger {
        OrderTrigger {
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
            total_amount: total,
            items,
        }
    }

    fn item(product: &str, quantity: u32, cents: i64) -> TriggerItem {
        TriggerItem {
            product_id: ProductId::new(product),
            quantity,
            price: Money::from_cents(cents),
        }
    }

    #[test]
    fn admission_computes_total_from_items() {
        let order = trigger(
            vec![item("P1", 2, 1000), item("P2", 1, 500)],
            Money::from_cents(2500),
        )
        .into_order()
        .unwrap();

        assert_eq!(order.total(), Money::from_cents(2500));
        assert_eq!(order.state(), OrderState::Created);
        assert_eq!(order.items().len(), 2);
        assert!(order.payment().is_none());
    }

    #[test]
    fn admission_rejects_empty_order() {
        let result = trigger(vec![], Money::zero()).into_order();
        assert!(matches!(result, Err(DomainError::EmptyOrder)));
    }

    #[test]
    fn admission_rejects_zero_quantity() {
        let result = trigger(vec![item("P1", 0, 1000)], Money::zero()).into_order();
        assert!(matches!(result, Err(DomainError::ZeroQuantity(_))));
    }

    #[test]
    fn admission_rejects_negative_price() {
        let result = trigger(vec![item("P1", 1, -5)], Money::from_cents(-5)).into_order();
        assert!(matches!(result, Err(DomainError::NegativePrice { .. })));
    }

    #[test]
    fn admission_rejects_total_mismatch() {
        let result = trigger(vec![item("P1", 2, 1000)], Money::from_cents(1999)).into_order();
        assert!(matches!(result, Err(DomainError::TotalMismatch { .. })));
    }

    #[test]
    fn admission_rejects_overflowing_total() {
        // The computed total saturates instead of wrapping, so an
        // overflowing order can never match its declared amount.
        let result = trigger(vec![item("P1", 2, i64::MAX)], Money::from_cents(100)).into_order();
        assert!(matches!(result, Err(DomainError::TotalMismatch { .. })));
    }

    #[test]
    fn line_total_multiplies_quantity() {
        let item = OrderItem::new("P1", 3, Money::from_cents(250));
        assert_eq!(item.line_total(), Money::from_cents(750));
    }

    #[test]
    fn trigger_message_deserializes_from_wire_shape() {
        let json = serde_json::json!({
            "order_id": "6f1c1a0a-0a5e-4e8e-a0a0-111111111111",
            "customer_id": "6f1c1a0a-0a5e-4e8e-a0a0-222222222222",
            "total_amount": { "cents": 2500 },
            "items": [
                { "product_id": "P1", "quantity": 2, "price": { "cents": 1000 } },
                { "product_id": "P2", "quantity": 1, "price": { "cents": 500 } }
            ]
        });

        let trigger: OrderTrigger = serde_json::from_value(json).unwrap();
        let order = trigger.into_order().unwrap();
        assert_eq!(order.total(), Money::from_cents(2500));
    }

    #[test]
    fn set_state_updates_transition_timestamp() {
        let mut order = trigger(vec![item("P1", 1, 100)], Money::from_cents(100))
            .into_order()
            .unwrap();
        let created = order.updated_at();

        let later = created + chrono::Duration::seconds(5);
        order.set_state(OrderState::PaymentPending, later);

        assert_eq!(order.state(), OrderState::PaymentPending);
        assert_eq!(order.updated_at(), later);
        assert_eq!(order.created_at(), created);
    }
}
