use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use tokio::sync::RwLock;

use crate::MAX_CAS_ATTEMPTS;
use crate::error::{LedgerError, Result};
use crate::ledger::{InventoryLedger, ReserveOutcome};

#[derive(Debug, Clone, Copy)]
struct StockRecord {
    stock: u32,
    version: u64,
}

/// In-memory inventory ledger for testing.
///
/// Implements the same read-check-write discipline as the PostgreSQL
/// implementation: the stock read and the conditional write happen under
/// separate lock acquisitions, so the version check is load-bearing.
#[derive(Clone, Default)]
pub struct InMemoryInventoryLedger {
    records: Arc<RwLock<HashMap<ProductId, StockRecord>>>,
    reserve_failure: Arc<RwLock<Option<ProductId>>>,
}

impl InMemoryInventoryLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or overwrites the stock level for a product.
    pub async fn set_stock(&self, product_id: impl Into<ProductId>, stock: u32) {
        let mut records = self.records.write().await;
        let record = records
            .entry(product_id.into())
            .or_insert(StockRecord { stock: 0, version: 0 });
        record.stock = stock;
        record.version += 1;
    }

    /// Returns the version stamp for a product, if it exists.
    pub async fn version_of(&self, product_id: &ProductId) -> Option<u64> {
        self.records.read().await.get(product_id).map(|r| r.version)
    }

    /// Makes `try_reserve` for the given product fail with
    /// [`LedgerError::Contention`], as if its CAS never resolved.
    pub async fn set_reserve_failure(&self, product_id: impl Into<ProductId>) {
        *self.reserve_failure.write().await = Some(product_id.into());
    }

    /// Clears a scripted reservation failure.
    pub async fn clear_reserve_failure(&self) {
        *self.reserve_failure.write().await = None;
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn try_reserve(&self, product_id: &ProductId, quantity: u32) -> Result<ReserveOutcome> {
        if let Some(failing) = self.reserve_failure.read().await.as_ref()
            && failing == product_id
        {
            return Err(LedgerError::Contention {
                product_id: product_id.clone(),
                attempts: MAX_CAS_ATTEMPTS,
            });
        }

        for _attempt in 0..MAX_CAS_ATTEMPTS {
            let observed = {
                let records = self.records.read().await;
                match records.get(product_id) {
                    Some(record) => *record,
                    None => return Ok(ReserveOutcome::ProductNotFound),
                }
            };

            if observed.stock < quantity {
                return Ok(ReserveOutcome::InsufficientStock {
                    available: observed.stock,
                });
            }

            let mut records = self.records.write().await;
            match records.get_mut(product_id) {
                Some(record) if record.version == observed.version => {
                    record.stock = observed.stock - quantity;
                    record.version += 1;
                    return Ok(ReserveOutcome::Reserved {
                        previous_stock: observed.stock,
                        new_stock: record.stock,
                    });
                }
                // Version moved between read and write; re-read.
                Some(_) => continue,
                None => return Ok(ReserveOutcome::ProductNotFound),
            }
        }

        Err(LedgerError::Contention {
            product_id: product_id.clone(),
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(product_id)
            .ok_or_else(|| LedgerError::ProductNotFound(product_id.clone()))?;
        record.stock += quantity;
        record.version += 1;
        Ok(())
    }

    async fn stock_of(&self, product_id: &ProductId) -> Result<Option<u32>> {
        Ok(self.records.read().await.get(product_id).map(|r| r.stock))
    }
}
