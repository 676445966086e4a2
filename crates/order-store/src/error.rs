//! Order store error types.

use common::OrderId;
use domain::OrderState;
use thiserror::Error;

/// Errors that can occur in the order record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order with this ID already exists.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// No order with this ID exists.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The conditional update failed because the stored state moved on.
    #[error("Stale state for order {order_id}: expected {expected}, actual {actual}")]
    StaleState {
        order_id: OrderId,
        expected: OrderState,
        actual: OrderState,
    },

    /// A persisted state could not be interpreted, or a requested
    /// transition is not a legal state-machine edge.
    #[error("Invalid order state: {0}")]
    InvalidState(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
