//! Payment adapter trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId};

use crate::error::SagaError;

/// Outcome of a charge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// Payment captured.
    Captured {
        /// Transaction reference assigned by the processor.
        transaction_ref: String,
    },

    /// Payment declined. Terminal for this order; never retried.
    Declined { reason: String },

    /// Processor temporarily unreachable. Retryable with backoff.
    Unavailable,
}

/// Outcome of a refund attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    /// Refund acknowledged.
    Refunded,

    /// Processor temporarily unreachable. Retryable with backoff.
    Unavailable,
}

/// Thin interface to the external payment capability.
///
/// The order id doubles as the idempotency key: charging the same order
/// twice must not double-charge, either at the real processor or because
/// the coordinator checks the durable payment record before re-invoking.
#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    /// Charges the customer for an order.
    async fn charge(&self, order_id: OrderId, amount: Money) -> Result<ChargeOutcome, SagaError>;

    /// Reverses a previously captured charge.
    async fn refund(
        &self,
        order_id: OrderId,
        transaction_ref: &str,
    ) -> Result<RefundOutcome, SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    captured: HashMap<OrderId, String>,
    refunds: Vec<(OrderId, String)>,
    next_id: u32,
    charge_attempts: u32,
    decline: bool,
    unavailable_remaining: u32,
    refund_unavailable: bool,
}

/// Deterministic in-memory payment adapter for testing.
///
/// Replaces the reference stub's probabilistic declines with explicit
/// switches so tests can script each outcome.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentAdapter {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentAdapter {
    /// Creates a new in-memory payment adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures charges to be declined.
    pub fn set_decline(&self, decline: bool) {
        self.state.write().unwrap().decline = decline;
    }

    /// Makes the next `n` charge calls return `Unavailable`.
    pub fn set_unavailable(&self, n: u32) {
        self.state.write().unwrap().unavailable_remaining = n;
    }

    /// Configures refunds to return `Unavailable`.
    pub fn set_refund_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().refund_unavailable = unavailable;
    }

    /// Total charge invocations, including unavailable and declined ones.
    pub fn charge_attempts(&self) -> u32 {
        self.state.read().unwrap().charge_attempts
    }

    /// Number of captures currently held (captures minus refunds).
    pub fn captured_count(&self) -> usize {
        self.state.read().unwrap().captured.len()
    }

    /// Number of refunds issued.
    pub fn refund_count(&self) -> usize {
        self.state.read().unwrap().refunds.len()
    }
}

#[async_trait]
impl PaymentAdapter for InMemoryPaymentAdapter {
    async fn charge(&self, order_id: OrderId, _amount: Money) -> Result<ChargeOutcome, SagaError> {
        let mut state = self.state.write().unwrap();
        state.charge_attempts += 1;

        if state.unavailable_remaining > 0 {
            state.unavailable_remaining -= 1;
            return Ok(ChargeOutcome::Unavailable);
        }

        if state.decline {
            return Ok(ChargeOutcome::Declined {
                reason: "card declined".to_string(),
            });
        }

        // Idempotent per order id: a repeated charge returns the capture
        // already held instead of creating a second one.
        if let Some(existing) = state.captured.get(&order_id) {
            return Ok(ChargeOutcome::Captured {
                transaction_ref: existing.clone(),
            });
        }

        state.next_id += 1;
        let transaction_ref = format!("TXN-{:04}", state.next_id);
        state.captured.insert(order_id, transaction_ref.clone());

        Ok(ChargeOutcome::Captured { transaction_ref })
    }

    async fn refund(
        &self,
        order_id: OrderId,
        transaction_ref: &str,
    ) -> Result<RefundOutcome, SagaError> {
        let mut state = self.state.write().unwrap();

        if state.refund_unavailable {
            return Ok(RefundOutcome::Unavailable);
        }

        state.captured.remove(&order_id);
        state.refunds.push((order_id, transaction_ref.to_string()));
        Ok(RefundOutcome::Refunded)
    }
}
