//! Domain error types.

use common::{Money, ProductId};
use thiserror::Error;

/// Errors raised when validating an order before any saga starts.
///
/// These are rejected at admission and never retried.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An order must carry at least one line item.
    #[error("Order has no line items")]
    EmptyOrder,

    /// Line item quantities must be at least 1.
    #[error("Line item for product {0} has zero quantity")]
    ZeroQuantity(ProductId),

    /// Unit prices must be non-negative.
    #[error("Line item for product {product_id} has negative price {price}")]
    NegativePrice { product_id: ProductId, price: Money },

    /// The total declared on the trigger does not match the line items.
    #[error("Declared total {declared} does not match computed total {computed}")]
    TotalMismatch { declared: Money, computed: Money },

    /// A persisted state string could not be parsed.
    #[error("Unknown order state: {0}")]
    UnknownState(String),
}
