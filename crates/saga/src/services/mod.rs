//! External collaborator traits and their in-memory test doubles.

pub mod notification;
pub mod payment;

pub use notification::{
    DeliveryOutcome, InMemoryNotificationSink, NotificationEvent, NotificationSink,
};
pub use payment::{ChargeOutcome, InMemoryPaymentAdapter, PaymentAdapter, RefundOutcome};
