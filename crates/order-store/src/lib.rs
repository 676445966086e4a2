//! Order record store: the single source of truth for an order's saga state.
//!
//! The store exposes a conditional-update primitive (`transition`) that only
//! applies a state change when the stored state still matches the caller's
//! expectation. The coordinator uses it as a compare-and-set to linearize
//! transitions for one order across workers.

mod error;
mod memory;
mod postgres;
mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;
