//! The order store trait.

use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderState, PaymentRecord};

use crate::error::Result;

/// Persistence for orders and their saga state.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a newly admitted order.
    ///
    /// Fails with [`StoreError::DuplicateOrder`](crate::StoreError::DuplicateOrder)
    /// if the order ID is already taken.
    async fn create(&self, order: Order) -> Result<()>;

    /// Loads an order by ID. Returns `None` if it does not exist.
    async fn load(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Conditionally advances the order state.
    ///
    /// The update only applies if the stored state still equals `from`;
    /// otherwise [`StoreError::StaleState`](crate::StoreError::StaleState)
    /// is returned and the caller must abort its redundant work. Also
    /// refreshes the last-transition timestamp. Edges outside the order
    /// state machine are rejected with
    /// [`StoreError::InvalidState`](crate::StoreError::InvalidState).
    async fn transition(&self, order_id: OrderId, from: OrderState, to: OrderState) -> Result<()>;

    /// Durably attaches a captured payment to the order.
    ///
    /// Recorded before the `PaymentPending → PaymentSucceeded` transition so
    /// that a crash between capture and transition still leaves the
    /// transaction reference recoverable for a refund.
    async fn record_payment(&self, order_id: OrderId, payment: PaymentRecord) -> Result<()>;
}
