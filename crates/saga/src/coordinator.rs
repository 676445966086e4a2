//! The saga coordinator: state-driven execution of the order workflow.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use common::{OrderId, ProductId};
use domain::{Order, OrderState, OrderTrigger, PaymentRecord};
use inventory::{InventoryLedger, ReserveOutcome};
use metrics::{counter, histogram};
use order_store::{OrderStore, StoreError};

use crate::error::{Result, SagaError};
use crate::execution::{ExecutionStatus, SagaReport, WorkflowStatus};
use crate::retry::RetryPolicy;
use crate::services::{
    ChargeOutcome, DeliveryOutcome, NotificationEvent, NotificationSink, PaymentAdapter,
    RefundOutcome,
};
use crate::steps;

/// Drives orders through the fulfillment workflow.
///
/// Execution is a loop over the order's persisted state: load the order,
/// perform the one step its state calls for, transition, repeat until a
/// terminal state. Because every step is keyed off durable state and every
/// transition is conditional, re-running the coordinator for an order that
/// crashed mid-saga resumes it without repeating completed work.
pub struct SagaCoordinator<St, L, P, N> {
    store: St,
    ledger: L,
    payment: P,
    notifier: N,
    retry: RetryPolicy,
    active: Arc<Mutex<HashSet<OrderId>>>,
}

impl<St, L, P, N> SagaCoordinator<St, L, P, N>
where
    St: OrderStore,
    L: InventoryLedger,
    P: PaymentAdapter,
    N: NotificationSink,
{
    /// Creates a coordinator with the retry policy from the environment.
    pub fn new(store: St, ledger: L, payment: P, notifier: N) -> Self {
        Self::with_retry(store, ledger, payment, notifier, RetryPolicy::from_env())
    }

    /// Creates a coordinator with an explicit retry policy.
    pub fn with_retry(store: St, ledger: L, payment: P, notifier: N, retry: RetryPolicy) -> Self {
        Self {
            store,
            ledger,
            payment,
            notifier,
            retry,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Validates a trigger and persists the order in `Created` state.
    ///
    /// Validation failures reject the trigger before anything is persisted;
    /// no saga starts for a rejected order.
    #[tracing::instrument(skip(self, trigger), fields(order_id = %trigger.order_id))]
    pub async fn admit(&self, trigger: OrderTrigger) -> Result<OrderId> {
        let order = trigger.into_order()?;
        let order_id = order.order_id();
        self.store.create(order).await?;
        counter!("saga_orders_admitted_total").increment(1);
        tracing::info!("order admitted");
        Ok(order_id)
    }

    /// Admits the trigger and runs the saga to a terminal state.
    ///
    /// A redelivered trigger for an already-admitted order resumes that
    /// order instead of failing, so trigger consumption is idempotent.
    pub async fn handle_trigger(&self, trigger: OrderTrigger) -> Result<SagaReport> {
        let order_id = trigger.order_id;
        match self.admit(trigger).await {
            Ok(_) => {}
            Err(SagaError::Store(StoreError::DuplicateOrder(_))) => {
                tracing::debug!(%order_id, "trigger redelivered, resuming existing order");
            }
            Err(e) => return Err(e),
        }
        self.run(order_id).await
    }

    /// Runs the saga for an order until it reaches a terminal state.
    ///
    /// At most one execution per order is admitted per process; a second
    /// concurrent call fails with [`SagaError::AlreadyRunning`]. Across
    /// processes the conditional state updates make the duplicate lose
    /// instead.
    #[tracing::instrument(skip(self), fields(order_id = %order_id))]
    pub async fn run(&self, order_id: OrderId) -> Result<SagaReport> {
        let _guard = self
            .acquire(order_id)
            .ok_or(SagaError::AlreadyRunning(order_id))?;

        counter!("saga_executions_total").increment(1);
        let mut report = SagaReport::new(order_id);

        match self.drive(order_id, &mut report).await {
            Ok(final_state) => {
                report.finish(final_state);
                let elapsed =
                    (Utc::now() - report.started_at()).num_milliseconds().max(0) as f64 / 1000.0;
                histogram!("saga_duration_seconds").record(elapsed);
                if report.is_success() {
                    counter!("saga_completed_total").increment(1);
                    tracing::info!("saga completed");
                } else {
                    counter!("saga_failed_total").increment(1);
                    tracing::warn!(
                        final_state = %final_state,
                        reason = report.failure_reason().unwrap_or("cancelled"),
                        "saga ended in failure state"
                    );
                }
                Ok(report)
            }
            Err(e) => {
                counter!("saga_aborted_total").increment(1);
                tracing::error!(error = %e, "saga aborted on infrastructure fault");
                self.send_notification(NotificationEvent::SystemError {
                    order_id,
                    error: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    /// Cancels an order that has not had inventory reserved.
    ///
    /// An order in `Created` or in `PaymentPending` without a capture goes
    /// straight to `Cancelled`. If the payment was already captured the
    /// cancellation routes through the refund and ends in `Refunded`. Any
    /// later state is past the point of no return and is rejected.
    #[tracing::instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<OrderState> {
        let _guard = self
            .acquire(order_id)
            .ok_or(SagaError::AlreadyRunning(order_id))?;

        let order = self
            .store
            .load(order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(order_id))?;

        let state = order.state();
        if !state.can_cancel() {
            return Err(SagaError::CancelNotAllowed { order_id, state });
        }

        if state == OrderState::Created {
            self.store
                .transition(order_id, OrderState::Created, OrderState::Cancelled)
                .await?;
            counter!("saga_orders_cancelled_total").increment(1);
            tracing::info!("order cancelled");
            return Ok(OrderState::Cancelled);
        }

        if order.payment().is_some() {
            // Money already moved; cancellation routes through the refund.
            self.store
                .transition(order_id, OrderState::PaymentPending, OrderState::Refunding)
                .await?;
            let order = self
                .store
                .load(order_id)
                .await?
                .ok_or(SagaError::OrderNotFound(order_id))?;
            let mut report = SagaReport::new(order_id);
            self.refund_payment(&order, &mut report).await?;
            counter!("saga_orders_cancelled_total").increment(1);
            tracing::info!("order cancelled with refund");
            return Ok(OrderState::Refunded);
        }

        self.store
            .transition(order_id, OrderState::PaymentPending, OrderState::Cancelled)
            .await?;
        counter!("saga_orders_cancelled_total").increment(1);
        tracing::info!("order cancelled");
        Ok(OrderState::Cancelled)
    }

    /// Read-only workflow status for an order.
    pub async fn status(&self, order_id: OrderId) -> Result<WorkflowStatus> {
        let order = self
            .store
            .load(order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(order_id))?;

        Ok(WorkflowStatus {
            order_id,
            status: ExecutionStatus::from_state(order.state()),
            started_at: order.created_at(),
            stopped_at: order.state().is_terminal().then(|| order.updated_at()),
        })
    }

    async fn drive(&self, order_id: OrderId, report: &mut SagaReport) -> Result<OrderState> {
        loop {
            let order = self
                .store
                .load(order_id)
                .await?
                .ok_or(SagaError::OrderNotFound(order_id))?;

            match order.state() {
                OrderState::Created => {
                    self.store
                        .transition(order_id, OrderState::Created, OrderState::PaymentPending)
                        .await?;
                }
                OrderState::PaymentPending => self.capture_payment(&order, report).await?,
                OrderState::PaymentSucceeded => {
                    self.store
                        .transition(
                            order_id,
                            OrderState::PaymentSucceeded,
                            OrderState::InventoryReserving,
                        )
                        .await?;
                }
                OrderState::InventoryReserving => self.reserve_inventory(&order, report).await?,
                OrderState::InsufficientStock => {
                    self.store
                        .transition(
                            order_id,
                            OrderState::InsufficientStock,
                            OrderState::Refunding,
                        )
                        .await?;
                }
                OrderState::Refunding => self.refund_payment(&order, report).await?,
                OrderState::Confirmed => self.notify_confirmed(&order, report).await?,
                state @ (OrderState::PaymentFailed
                | OrderState::Refunded
                | OrderState::Notified
                | OrderState::Cancelled) => return Ok(state),
            }
        }
    }

    /// Charges the order total, retrying transient processor outages.
    ///
    /// Ends with the order in `PaymentSucceeded` (captured), or
    /// `PaymentFailed` (declined, or retries exhausted). The payment record
    /// is persisted before the state transition so a crash in between still
    /// leaves the transaction reference recoverable for a refund, and so a
    /// resumed run knows not to charge again.
    async fn capture_payment(&self, order: &Order, report: &mut SagaReport) -> Result<()> {
        let order_id = order.order_id();

        if order.payment().is_some() {
            // Resumed after a crash between capture and transition; the
            // charge already happened.
            self.store
                .transition(
                    order_id,
                    OrderState::PaymentPending,
                    OrderState::PaymentSucceeded,
                )
                .await?;
            return Ok(());
        }

        for attempt in 1..=self.retry.max_attempts {
            report.record_attempt(steps::STEP_CAPTURE_PAYMENT);
            match self.payment.charge(order_id, order.total()).await? {
                ChargeOutcome::Captured { transaction_ref } => {
                    let record = PaymentRecord {
                        transaction_ref: transaction_ref.clone(),
                        amount: order.total(),
                        captured_at: Utc::now(),
                    };
                    self.store.record_payment(order_id, record).await?;
                    match self
                        .store
                        .transition(
                            order_id,
                            OrderState::PaymentPending,
                            OrderState::PaymentSucceeded,
                        )
                        .await
                    {
                        Ok(()) => {}
                        Err(
                            e @ StoreError::StaleState {
                                actual: OrderState::Cancelled,
                                ..
                            },
                        ) => {
                            // A cancellation won without seeing the capture;
                            // nothing else will reverse the charge.
                            tracing::warn!(%order_id, "order cancelled during capture, refunding");
                            match self.payment.refund(order_id, &transaction_ref).await? {
                                RefundOutcome::Refunded => {
                                    report.record_compensation(steps::COMP_REFUND_PAYMENT);
                                }
                                RefundOutcome::Unavailable => {
                                    return Err(SagaError::PaymentAdapter(format!(
                                        "refund for cancelled order {order_id} could not be completed"
                                    )));
                                }
                            }
                            return Err(e.into());
                        }
                        Err(e @ StoreError::StaleState { .. }) => {
                            // Another execution advanced the order; the
                            // durable payment record belongs to it now.
                            // Refunding here would strip a fulfilled or
                            // already-compensating order of its capture.
                            tracing::warn!(%order_id, "lost transition race after capture");
                            return Err(e.into());
                        }
                        Err(e) => return Err(e.into()),
                    }
                    counter!("saga_payments_captured_total").increment(1);
                    tracing::info!(%order_id, %transaction_ref, amount = %order.total(), "payment captured");
                    return Ok(());
                }
                ChargeOutcome::Declined { reason } => {
                    tracing::warn!(%order_id, %reason, "payment declined");
                    counter!("saga_payments_declined_total").increment(1);
                    self.store
                        .transition(
                            order_id,
                            OrderState::PaymentPending,
                            OrderState::PaymentFailed,
                        )
                        .await?;
                    self.send_notification(NotificationEvent::PaymentFailed {
                        order_id,
                        amount: order.total(),
                    })
                    .await;
                    report.record_failure(format!("payment declined: {reason}"));
                    return Ok(());
                }
                ChargeOutcome::Unavailable => {
                    if attempt < self.retry.max_attempts {
                        let delay = self.retry.delay_for(attempt);
                        tracing::debug!(%order_id, attempt, ?delay, "payment processor unavailable, backing off");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        tracing::warn!(%order_id, attempts = self.retry.max_attempts, "payment retries exhausted");
        self.store
            .transition(
                order_id,
                OrderState::PaymentPending,
                OrderState::PaymentFailed,
            )
            .await?;
        self.send_notification(NotificationEvent::PaymentFailed {
            order_id,
            amount: order.total(),
        })
        .await;
        report.record_failure("payment processor unavailable");
        Ok(())
    }

    /// Reserves stock for every line item, or compensates and records the
    /// shortfall.
    ///
    /// Items are reserved in ascending product id order so concurrent sagas
    /// over overlapping product sets acquire stock in a consistent order. On
    /// any shortfall the items already reserved are released in reverse
    /// order and the order moves to `InsufficientStock`.
    async fn reserve_inventory(&self, order: &Order, report: &mut SagaReport) -> Result<()> {
        let order_id = order.order_id();
        report.record_attempt(steps::STEP_RESERVE_INVENTORY);

        let mut items = order.items().to_vec();
        items.sort_by(|a, b| a.product_id.cmp(&b.product_id));

        let mut reserved: Vec<(ProductId, u32)> = Vec::new();
        for item in &items {
            let outcome = match self.ledger.try_reserve(&item.product_id, item.quantity).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Infrastructure fault mid-reservation; hand the stock
                    // back so the resumed run starts from a clean slate.
                    self.release_reserved(&reserved, report).await;
                    return Err(e.into());
                }
            };

            match outcome {
                ReserveOutcome::Reserved {
                    previous_stock,
                    new_stock,
                } => {
                    tracing::debug!(
                        %order_id,
                        product_id = %item.product_id,
                        previous_stock,
                        new_stock,
                        "stock reserved"
                    );
                    reserved.push((item.product_id.clone(), item.quantity));
                }
                ReserveOutcome::InsufficientStock { available } => {
                    tracing::warn!(
                        %order_id,
                        product_id = %item.product_id,
                        available,
                        requested = item.quantity,
                        "insufficient stock"
                    );
                    counter!("saga_stock_shortfalls_total").increment(1);
                    return self.abandon_reservation(order_id, &item.product_id, reserved, report).await;
                }
                ReserveOutcome::ProductNotFound => {
                    tracing::warn!(%order_id, product_id = %item.product_id, "no inventory record");
                    counter!("saga_stock_shortfalls_total").increment(1);
                    return self.abandon_reservation(order_id, &item.product_id, reserved, report).await;
                }
            }
        }

        self.store
            .transition(
                order_id,
                OrderState::InventoryReserving,
                OrderState::Confirmed,
            )
            .await?;
        Ok(())
    }

    /// Releases partial reservations and records the shortfall outcome.
    ///
    /// The stock-insufficient notification is sent once, here at shortfall
    /// discovery; the refund that follows does not notify again.
    async fn abandon_reservation(
        &self,
        order_id: OrderId,
        short_product: &ProductId,
        reserved: Vec<(ProductId, u32)>,
        report: &mut SagaReport,
    ) -> Result<()> {
        self.release_reserved(&reserved, report).await;
        self.store
            .transition(
                order_id,
                OrderState::InventoryReserving,
                OrderState::InsufficientStock,
            )
            .await?;
        self.send_notification(NotificationEvent::StockInsufficient {
            order_id,
            product_id: short_product.clone(),
        })
        .await;
        report.record_failure(format!("insufficient stock for {short_product}"));
        Ok(())
    }

    /// Releases previously reserved items in reverse reservation order.
    async fn release_reserved(&self, reserved: &[(ProductId, u32)], report: &mut SagaReport) {
        for (product_id, quantity) in reserved.iter().rev() {
            if let Err(e) = self.ledger.release(product_id, *quantity).await {
                tracing::error!(%product_id, quantity, error = %e, "failed to release reserved stock");
            }
        }
        if !reserved.is_empty() {
            report.record_compensation(steps::COMP_RELEASE_INVENTORY);
        }
    }

    /// Refunds the captured payment and moves the order to `Refunded`.
    ///
    /// If nothing was captured the refund is a no-op transition. If the
    /// processor stays unavailable past the retry budget the order is left
    /// in `Refunding` so a later run can retry; the capture is never
    /// silently dropped.
    async fn refund_payment(&self, order: &Order, report: &mut SagaReport) -> Result<()> {
        let order_id = order.order_id();
        let Some(payment) = order.payment() else {
            self.store
                .transition(order_id, OrderState::Refunding, OrderState::Refunded)
                .await?;
            return Ok(());
        };

        for attempt in 1..=self.retry.max_attempts {
            match self.payment.refund(order_id, &payment.transaction_ref).await? {
                RefundOutcome::Refunded => {
                    tracing::info!(
                        %order_id,
                        transaction_ref = %payment.transaction_ref,
                        amount = %payment.amount,
                        "payment refunded"
                    );
                    counter!("saga_refunds_total").increment(1);
                    report.record_compensation(steps::COMP_REFUND_PAYMENT);
                    self.store
                        .transition(order_id, OrderState::Refunding, OrderState::Refunded)
                        .await?;
                    return Ok(());
                }
                RefundOutcome::Unavailable if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::debug!(%order_id, attempt, ?delay, "refund unavailable, backing off");
                    tokio::time::sleep(delay).await;
                }
                RefundOutcome::Unavailable => break,
            }
        }

        Err(SagaError::PaymentAdapter(format!(
            "refund for order {order_id} could not be completed"
        )))
    }

    /// Notifies the customer of fulfillment and finishes the saga.
    ///
    /// Notification is fire-and-forget: a sink outage never blocks the
    /// transition to `Notified`.
    async fn notify_confirmed(&self, order: &Order, report: &mut SagaReport) -> Result<()> {
        let order_id = order.order_id();
        report.record_attempt(steps::STEP_NOTIFY_CUSTOMER);
        self.send_notification(NotificationEvent::OrderConfirmed {
            order_id,
            amount: order.total(),
            transaction_ref: order.payment().map(|p| p.transaction_ref.clone()),
        })
        .await;
        self.store
            .transition(order_id, OrderState::Confirmed, OrderState::Notified)
            .await?;
        Ok(())
    }

    async fn send_notification(&self, event: NotificationEvent) {
        let order_id = event.order_id();
        match self.notifier.notify(event).await {
            Ok(DeliveryOutcome::Delivered { message_id }) => {
                tracing::debug!(%order_id, %message_id, "notification delivered");
            }
            Ok(DeliveryOutcome::Unavailable) => {
                tracing::warn!(%order_id, "notification sink unavailable, dropping event");
            }
            Err(e) => {
                tracing::warn!(%order_id, error = %e, "notification delivery failed");
            }
        }
    }

    fn acquire(&self, order_id: OrderId) -> Option<ActiveGuard> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(order_id) {
            return None;
        }
        Some(ActiveGuard {
            active: Arc::clone(&self.active),
            order_id,
        })
    }
}

/// Removes the order from the active set when the execution ends, including
/// on early returns and panics.
struct ActiveGuard {
    active: Arc<Mutex<HashSet<OrderId>>>,
    order_id: OrderId,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.order_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerId, Money};
    use domain::TriggerItem;
    use inventory::InMemoryInventoryLedger;
    use order_store::InMemoryOrderStore;

    use crate::services::{InMemoryNotificationSink, InMemoryPaymentAdapter};

    type TestCoordinator = SagaCoordinator<
        InMemoryOrderStore,
        InMemoryInventoryLedger,
        InMemoryPaymentAdapter,
        InMemoryNotificationSink,
    >;

    struct Setup {
        coordinator: TestCoordinator,
        store: InMemoryOrderStore,
        ledger: InMemoryInventoryLedger,
        payment: InMemoryPaymentAdapter,
        sink: InMemoryNotificationSink,
    }

    fn setup() -> Setup {
        let store = InMemoryOrderStore::new();
        let ledger = InMemoryInventoryLedger::new();
        let payment = InMemoryPaymentAdapter::new();
        let sink = InMemoryNotificationSink::new();
        let coordinator = SagaCoordinator::with_retry(
            store.clone(),
            ledger.clone(),
            payment.clone(),
            sink.clone(),
            RetryPolicy::immediate(3),
        );
        Setup {
            coordinator,
            store,
            ledger,
            payment,
            sink,
        }
    }

    fn trigger(items: Vec<(&str, u32, i64)>) -> OrderTrigger {
        let items: Vec<TriggerItem> = items
            .into_iter()
            .map(|(product, quantity, cents)| TriggerItem {
                product_id: ProductId::new(product),
                quantity,
                price: Money::from_cents(cents),
            })
            .collect();
        let total = items
            .iter()
            .fold(Money::zero(), |acc, i| acc + i.price.multiply(i.quantity));
        OrderTrigger {
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
            total_amount: total,
            items,
        }
    }

    #[tokio::test]
    async fn happy_path_reaches_notified() {
        let s = setup();
        s.ledger.set_stock("P1", 5).await;

        let report = s
            .coordinator
            .handle_trigger(trigger(vec![("P1", 2, 1000)]))
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.final_state(), OrderState::Notified);
        assert_eq!(
            s.ledger.stock_of(&ProductId::new("P1")).await.unwrap(),
            Some(3)
        );
        assert!(matches!(
            s.sink.events().as_slice(),
            [NotificationEvent::OrderConfirmed { .. }]
        ));
    }

    #[tokio::test]
    async fn declined_payment_leaves_stock_untouched() {
        let s = setup();
        s.ledger.set_stock("P1", 5).await;
        s.payment.set_decline(true);

        let report = s
            .coordinator
            .handle_trigger(trigger(vec![("P1", 2, 1000)]))
            .await
            .unwrap();

        assert_eq!(report.final_state(), OrderState::PaymentFailed);
        assert_eq!(s.payment.captured_count(), 0);
        assert_eq!(
            s.ledger.stock_of(&ProductId::new("P1")).await.unwrap(),
            Some(5)
        );
        assert!(matches!(
            s.sink.events().as_slice(),
            [NotificationEvent::PaymentFailed { .. }]
        ));
    }

    #[tokio::test]
    async fn invalid_trigger_is_rejected_before_persistence() {
        let s = setup();
        let mut bad = trigger(vec![("P1", 1, 1000)]);
        bad.total_amount = Money::from_cents(1);

        let result = s.coordinator.handle_trigger(bad).await;

        assert!(matches!(result, Err(SagaError::Domain(_))));
        assert_eq!(s.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn run_unknown_order_fails() {
        let s = setup();
        let result = s.coordinator.run(OrderId::new()).await;
        assert!(matches!(result, Err(SagaError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn cancel_created_order() {
        let s = setup();
        let order_id = s
            .coordinator
            .admit(trigger(vec![("P1", 1, 1000)]))
            .await
            .unwrap();

        let state = s.coordinator.cancel(order_id).await.unwrap();

        assert_eq!(state, OrderState::Cancelled);
        let order = s.store.load(order_id).await.unwrap().unwrap();
        assert_eq!(order.state(), OrderState::Cancelled);
    }

    #[tokio::test]
    async fn cancel_payment_pending_without_capture() {
        let s = setup();
        let order_id = s
            .coordinator
            .admit(trigger(vec![("P1", 1, 1000)]))
            .await
            .unwrap();
        s.store
            .transition(order_id, OrderState::Created, OrderState::PaymentPending)
            .await
            .unwrap();

        let state = s.coordinator.cancel(order_id).await.unwrap();
        assert_eq!(state, OrderState::Cancelled);
    }

    #[tokio::test]
    async fn cancel_after_capture_refunds() {
        let s = setup();
        let order_id = s
            .coordinator
            .admit(trigger(vec![("P1", 1, 1000)]))
            .await
            .unwrap();
        s.store
            .transition(order_id, OrderState::Created, OrderState::PaymentPending)
            .await
            .unwrap();
        s.store
            .record_payment(
                order_id,
                PaymentRecord {
                    transaction_ref: "TXN-0001".to_string(),
                    amount: Money::from_cents(1000),
                    captured_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let state = s.coordinator.cancel(order_id).await.unwrap();

        assert_eq!(state, OrderState::Refunded);
        assert_eq!(s.payment.refund_count(), 1);
    }

    #[tokio::test]
    async fn cancel_confirmed_order_is_rejected() {
        let s = setup();
        s.ledger.set_stock("P1", 5).await;
        let order_id = s
            .coordinator
            .handle_trigger(trigger(vec![("P1", 1, 1000)]))
            .await
            .unwrap()
            .order_id();

        let result = s.coordinator.cancel(order_id).await;

        assert!(matches!(
            result,
            Err(SagaError::CancelNotAllowed {
                state: OrderState::Notified,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn status_reflects_terminal_state() {
        let s = setup();
        s.ledger.set_stock("P1", 5).await;
        let order_id = s
            .coordinator
            .handle_trigger(trigger(vec![("P1", 1, 1000)]))
            .await
            .unwrap()
            .order_id();

        let status = s.coordinator.status(order_id).await.unwrap();

        assert_eq!(status.status, ExecutionStatus::Succeeded);
        assert!(status.stopped_at.is_some());
    }

    #[tokio::test]
    async fn status_of_admitted_order_is_running() {
        let s = setup();
        let order_id = s
            .coordinator
            .admit(trigger(vec![("P1", 1, 1000)]))
            .await
            .unwrap();

        let status = s.coordinator.status(order_id).await.unwrap();

        assert_eq!(status.status, ExecutionStatus::Running);
        assert!(status.stopped_at.is_none());
    }

    #[tokio::test]
    async fn status_of_unknown_order_fails() {
        let s = setup();
        let result = s.coordinator.status(OrderId::new()).await;
        assert!(matches!(result, Err(SagaError::OrderNotFound(_))));
    }
}
