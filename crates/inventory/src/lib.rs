//! Inventory ledger: per-product stock guarded by optimistic concurrency.
//!
//! Reservation is a compare-and-swap on (stock, version): read the current
//! pair, reject if stock is short, otherwise write `stock - quantity` at
//! `version + 1` conditioned on the version being unchanged. A bounded
//! number of retries resolves contention per product; there is no global
//! lock and no cross-product locking.

mod error;
mod ledger;
mod memory;
mod postgres;

pub use error::{LedgerError, Result};
pub use ledger::{InventoryLedger, ReserveOutcome};
pub use memory::InMemoryInventoryLedger;
pub use postgres::PostgresInventoryLedger;

/// Upper bound on read-check-write attempts before a reservation or release
/// reports contention.
pub const MAX_CAS_ATTEMPTS: u32 = 8;
