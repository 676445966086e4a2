//! Saga error types.

use common::OrderId;
use domain::{DomainError, OrderState};
use inventory::LedgerError;
use order_store::StoreError;
use thiserror::Error;

/// Errors that can occur during saga operations.
///
/// Expected business outcomes (payment declined, insufficient stock) are
/// not errors; they drive the state machine to compensated terminal
/// states. Only validation rejects and infrastructure faults surface here.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The trigger failed validation; no saga was started.
    #[error("Invalid order: {0}")]
    Domain(#[from] DomainError),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An execution for this order is already in flight in this process.
    #[error("Saga already running for order {0}")]
    AlreadyRunning(OrderId),

    /// Cancellation was requested in a state that does not allow it.
    #[error("Order {order_id} cannot be cancelled in state {state}")]
    CancelNotAllowed { order_id: OrderId, state: OrderState },

    /// Order record store error (includes lost conditional updates).
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    /// Inventory ledger error (includes unresolved contention).
    #[error("Inventory ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Payment adapter infrastructure fault.
    #[error("Payment adapter error: {0}")]
    PaymentAdapter(String),

    /// Notification sink infrastructure fault. Never fatal to a saga.
    #[error("Notification sink error: {0}")]
    NotificationSink(String),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
