use async_trait::async_trait;
use common::ProductId;
use sqlx::{PgPool, Row};

use crate::MAX_CAS_ATTEMPTS;
use crate::error::{LedgerError, Result};
use crate::ledger::{InventoryLedger, ReserveOutcome};

/// PostgreSQL-backed inventory ledger.
///
/// One row per product with a version column. Reservation reads
/// (stock, version) and then issues an `UPDATE ... WHERE version = $read`;
/// a lost update re-reads and retries up to [`MAX_CAS_ATTEMPTS`].
#[derive(Clone)]
pub struct PostgresInventoryLedger {
    pool: PgPool,
}

impl PostgresInventoryLedger {
    /// Creates a new PostgreSQL inventory ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the inventory schema.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../../../migrations/002_create_inventory.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn read_record(&self, product_id: &ProductId) -> Result<Option<(i64, i64)>> {
        let row = sqlx::query("SELECT stock_quantity, version FROM inventory WHERE product_id = $1")
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some((
                row.try_get("stock_quantity")?,
                row.try_get("version")?,
            ))),
            None => Ok(None),
        }
    }

    async fn write_conditional(
        &self,
        product_id: &ProductId,
        new_stock: i64,
        observed_version: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET stock_quantity = $2, version = version + 1, last_updated = NOW()
            WHERE product_id = $1 AND version = $3
            "#,
        )
        .bind(product_id.as_str())
        .bind(new_stock)
        .bind(observed_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl InventoryLedger for PostgresInventoryLedger {
    async fn try_reserve(&self, product_id: &ProductId, quantity: u32) -> Result<ReserveOutcome> {
        for attempt in 0..MAX_CAS_ATTEMPTS {
            let Some((stock, version)) = self.read_record(product_id).await? else {
                return Ok(ReserveOutcome::ProductNotFound);
            };

            if stock < quantity as i64 {
                return Ok(ReserveOutcome::InsufficientStock {
                    available: stock as u32,
                });
            }

            let new_stock = stock - quantity as i64;
            if self.write_conditional(product_id, new_stock, version).await? {
                return Ok(ReserveOutcome::Reserved {
                    previous_stock: stock as u32,
                    new_stock: new_stock as u32,
                });
            }

            tracing::debug!(%product_id, attempt, "reservation lost version race, retrying");
        }

        Err(LedgerError::Contention {
            product_id: product_id.clone(),
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        for _attempt in 0..MAX_CAS_ATTEMPTS {
            let Some((stock, version)) = self.read_record(product_id).await? else {
                return Err(LedgerError::ProductNotFound(product_id.clone()));
            };

            let new_stock = stock + quantity as i64;
            if self.write_conditional(product_id, new_stock, version).await? {
                return Ok(());
            }
        }

        Err(LedgerError::Contention {
            product_id: product_id.clone(),
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    async fn stock_of(&self, product_id: &ProductId) -> Result<Option<u32>> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM inventory WHERE product_id = $1")
                .bind(product_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(stock.map(|s| s as u32))
    }
}
