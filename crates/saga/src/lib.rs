//! Saga orchestration for order fulfillment.
//!
//! Coordinates order admission, payment capture, inventory deduction, and
//! customer notification as one logical transaction over non-transactional
//! backends. The saga never guarantees
//! ACID atomicity: every partially completed order either reaches a terminal
//! success state or is fully compensated to a terminal failure state, with
//! no stock decremented without a recorded order and no payment captured
//! without either fulfillment or refund.
//!
//! Forward path: payment → inventory → confirmation → notification, with the
//! order's state persisted after every transition so a crash mid-saga can be
//! resumed from the last durable state. The one cross-step compensation is
//! the refund issued when a stock shortfall is discovered after money moved.

pub mod coordinator;
pub mod error;
pub mod execution;
pub mod retry;
pub mod services;
pub mod steps;

pub use coordinator::SagaCoordinator;
pub use error::SagaError;
pub use execution::{ExecutionStatus, SagaReport, WorkflowStatus};
pub use retry::RetryPolicy;
pub use services::{
    ChargeOutcome, DeliveryOutcome, InMemoryNotificationSink, InMemoryPaymentAdapter,
    NotificationEvent, NotificationSink, PaymentAdapter, RefundOutcome,
};
