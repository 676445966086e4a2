//! Shared identifier and value types used across the saga workspace.

mod types;

pub use types::{CustomerId, Money, OrderId, ProductId};
