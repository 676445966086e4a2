//! Execution records: the per-run saga report and the coarse status query.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::OrderId;
use domain::OrderState;
use serde::{Deserialize, Serialize};

/// Record of one saga execution for an order.
///
/// Tracks attempt counts per step and the compensations applied, in order.
/// Returned by the coordinator once the order reaches a terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct SagaReport {
    order_id: OrderId,
    final_state: OrderState,
    attempts: BTreeMap<&'static str, u32>,
    compensations: Vec<&'static str>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

impl SagaReport {
    /// Starts a new report for the given order.
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            final_state: OrderState::Created,
            attempts: BTreeMap::new(),
            compensations: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            failure_reason: None,
        }
    }

    /// Records one attempt of the named step.
    pub fn record_attempt(&mut self, step: &'static str) {
        *self.attempts.entry(step).or_insert(0) += 1;
    }

    /// Records an applied compensation.
    pub fn record_compensation(&mut self, compensation: &'static str) {
        self.compensations.push(compensation);
    }

    /// Records why the saga did not confirm.
    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.failure_reason = Some(reason.into());
    }

    /// Marks the execution finished in the given terminal state.
    pub fn finish(&mut self, state: OrderState) {
        self.final_state = state;
        self.finished_at = Some(Utc::now());
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// The terminal state the order reached.
    pub fn final_state(&self) -> OrderState {
        self.final_state
    }

    /// Attempts made for the named step in this run.
    pub fn attempts(&self, step: &str) -> u32 {
        self.attempts.get(step).copied().unwrap_or(0)
    }

    /// Compensations applied, in application order.
    pub fn compensations(&self) -> &[&'static str] {
        &self.compensations
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// True if the order was fulfilled.
    pub fn is_success(&self) -> bool {
        self.final_state == OrderState::Notified
    }
}

/// Coarse execution status for the external status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
}

impl ExecutionStatus {
    /// Derives the coarse status from the order's saga state.
    pub fn from_state(state: OrderState) -> Self {
        match state {
            OrderState::Notified => ExecutionStatus::Succeeded,
            OrderState::PaymentFailed | OrderState::Refunded | OrderState::Cancelled => {
                ExecutionStatus::Failed
            }
            _ => ExecutionStatus::Running,
        }
    }
}

/// Answer to the read-only workflow status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub order_id: OrderId,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    /// Set once the order reached a terminal state.
    pub stopped_at: Option<DateTime<Utc>>,
}
