//! Inventory ledger error types.

use common::ProductId;
use thiserror::Error;

/// Errors that can occur in the inventory ledger.
///
/// Running out of stock is not an error; see
/// [`ReserveOutcome`](crate::ReserveOutcome).
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The versioned compare-and-swap kept losing; the caller may retry
    /// later. Distinct from insufficient stock.
    #[error("Contention on product {product_id} after {attempts} attempts")]
    Contention { product_id: ProductId, attempts: u32 },

    /// The product does not exist (release path).
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for ledger results.
pub type Result<T> = std::result::Result<T, LedgerError>;
