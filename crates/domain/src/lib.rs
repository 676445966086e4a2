//! Order domain: records, the saga state machine, and admission validation.

mod error;
mod order;
mod state;

pub use error::DomainError;
pub use order::{Order, OrderItem, OrderTrigger, PaymentRecord, TriggerItem};
pub use state::OrderState;
