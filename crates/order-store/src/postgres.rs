use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, ProductId};
use domain::{Order, OrderItem, OrderState, PaymentRecord};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::OrderStore;

/// PostgreSQL-backed order store.
///
/// One row per order, one row per line item keyed by (order id, product id).
/// The saga state lives in the `status` column; `transition` is a
/// conditional `UPDATE ... WHERE status = $from`.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the order schema.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../../../migrations/001_create_orders.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let state: OrderState = status
            .parse()
            .map_err(|_| StoreError::InvalidState(status))?;

        let payment = match row.try_get::<Option<String>, _>("payment_ref")? {
            Some(transaction_ref) => Some(PaymentRecord {
                transaction_ref,
                amount: Money::from_cents(row.try_get("payment_amount_cents")?),
                captured_at: row.try_get("payment_captured_at")?,
            }),
            None => None,
        };

        Ok(Order::from_parts(
            OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            items,
            Money::from_cents(row.try_get("total_cents")?),
            state,
            payment,
            row.try_get::<DateTime<Utc>, _>("created_at")?,
            row.try_get::<DateTime<Utc>, _>("updated_at")?,
        ))
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, order: Order) -> Result<()> {
        let order_id = order.order_id();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (order_id, customer_id, status, total_cents, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(order.customer_id().as_uuid())
        .bind(order.state().as_str())
        .bind(order.total().cents())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return StoreError::DuplicateOrder(order_id);
            }
            StoreError::Database(e)
        })?;

        for item in order.items() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(item.product_id.as_str())
            .bind(item.quantity as i64)
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT order_id, customer_id, status, total_cents,
                   payment_ref, payment_amount_cents, payment_captured_at,
                   created_at, updated_at
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let item_rows = sqlx::query(
            r#"
            SELECT product_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY product_id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .into_iter()
            .map(|row| {
                Ok(OrderItem::new(
                    ProductId::new(row.try_get::<String, _>("product_id")?),
                    row.try_get::<i64, _>("quantity")? as u32,
                    Money::from_cents(row.try_get("unit_price_cents")?),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Self::row_to_order(&row, items)?))
    }

    async fn transition(&self, order_id: OrderId, from: OrderState, to: OrderState) -> Result<()> {
        if !from.can_transition_to(to) {
            return Err(StoreError::InvalidState(format!(
                "illegal transition {from} -> {to}"
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $3, updated_at = NOW()
            WHERE order_id = $1 AND status = $2
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Distinguish a missing order from a lost conditional update.
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match current {
            None => Err(StoreError::OrderNotFound(order_id)),
            Some(status) => {
                let actual: OrderState = status
                    .parse()
                    .map_err(|_| StoreError::InvalidState(status))?;
                Err(StoreError::StaleState {
                    order_id,
                    expected: from,
                    actual,
                })
            }
        }
    }

    async fn record_payment(&self, order_id: OrderId, payment: PaymentRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_ref = $2, payment_amount_cents = $3, payment_captured_at = $4
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(&payment.transaction_ref)
        .bind(payment.amount.cents())
        .bind(payment.captured_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order_id));
        }
        Ok(())
    }
}
