//! The inventory ledger trait.

use async_trait::async_trait;
use common::ProductId;

use crate::error::Result;

/// Outcome of a reservation attempt.
///
/// Shortfalls and unknown products are expected business outcomes, so they
/// are variants rather than errors; only contention and infrastructure
/// faults surface as [`LedgerError`](crate::LedgerError).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Stock was deducted.
    Reserved {
        /// Stock level observed before the deduction.
        previous_stock: u32,
        /// Stock level after the deduction.
        new_stock: u32,
    },

    /// Not enough stock to cover the requested quantity; nothing changed.
    InsufficientStock {
        /// Stock available at the time of the check.
        available: u32,
    },

    /// No inventory record exists for this product.
    ProductNotFound,
}

/// Atomic reserve/release operations over per-product stock.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Attempts to deduct `quantity` units of `product_id`.
    ///
    /// Implementations must guarantee that concurrent reservations never
    /// oversell: the sum of successful deductions never exceeds the stock
    /// that was provisioned, and stock never goes negative.
    async fn try_reserve(&self, product_id: &ProductId, quantity: u32) -> Result<ReserveOutcome>;

    /// Returns `quantity` units of `product_id` to stock.
    ///
    /// The ledger only guarantees the increment is applied atomically;
    /// releasing more than was reserved for a given order is the
    /// coordinator's responsibility to prevent.
    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<()>;

    /// Current stock level, if the product exists.
    async fn stock_of(&self, product_id: &ProductId) -> Result<Option<u32>>;
}
