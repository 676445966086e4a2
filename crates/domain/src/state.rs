//! Order saga state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The state of an order as its fulfillment saga progresses.
///
/// State transitions:
/// ```text
/// Created ──► PaymentPending ──┬──► PaymentSucceeded ──► InventoryReserving ──┬──► Confirmed ──► Notified
///     │             │          └──► PaymentFailed                             │
///     │             │                                                         └──► InsufficientStock
///     │             │                                                                   │
///     │             ├──► Refunding ◄──────────────────────────────────────────────────┘
///     │             │        │
///     │             │        └──► Refunded
///     └─────────────┴──► Cancelled
/// ```
///
/// `PaymentFailed`, `Refunded`, `Notified` and `Cancelled` are terminal.
/// `PaymentPending → Refunding` only happens when an order with a captured
/// payment is cancelled before the state advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderState {
    /// Order admitted and persisted; saga not yet started.
    #[default]
    Created,

    /// Payment capture is being attempted.
    PaymentPending,

    /// Payment captured; inventory not yet touched.
    PaymentSucceeded,

    /// Payment declined or permanently unavailable (terminal state).
    PaymentFailed,

    /// Line items are being reserved against the inventory ledger.
    InventoryReserving,

    /// A line item could not be covered; reservations for this order
    /// have been released.
    InsufficientStock,

    /// The captured payment is being reversed.
    Refunding,

    /// Payment reversed after a stock shortfall or cancellation
    /// (terminal state).
    Refunded,

    /// Payment captured and all stock deducted.
    Confirmed,

    /// Terminal-state notification attempted (terminal state).
    Notified,

    /// Cancelled before any money moved (terminal state).
    Cancelled,
}

impl OrderState {
    /// Returns true if this is a terminal state (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::PaymentFailed
                | OrderState::Refunded
                | OrderState::Notified
                | OrderState::Cancelled
        )
    }

    /// Returns true if an external cancellation is allowed in this state.
    ///
    /// Once inventory has been reserved, cancellation must route through
    /// the same compensation path as a stock shortfall instead.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderState::Created | OrderState::PaymentPending)
    }

    /// Returns true if `next` is a legal direct transition from this state.
    pub fn can_transition_to(&self, next: OrderState) -> bool {
        use OrderState::*;
        matches!(
            (self, next),
            (Created, PaymentPending)
                | (Created, Cancelled)
                | (PaymentPending, PaymentSucceeded)
                | (PaymentPending, PaymentFailed)
                | (PaymentPending, Refunding)
                | (PaymentPending, Cancelled)
                | (PaymentSucceeded, InventoryReserving)
                | (InventoryReserving, Confirmed)
                | (InventoryReserving, InsufficientStock)
                | (InsufficientStock, Refunding)
                | (Refunding, Refunded)
                | (Confirmed, Notified)
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Created => "Created",
            OrderState::PaymentPending => "PaymentPending",
            OrderState::PaymentSucceeded => "PaymentSucceeded",
            OrderState::PaymentFailed => "PaymentFailed",
            OrderState::InventoryReserving => "InventoryReserving",
            OrderState::InsufficientStock => "InsufficientStock",
            OrderState::Refunding => "Refunding",
            OrderState::Refunded => "Refunded",
            OrderState::Confirmed => "Confirmed",
            OrderState::Notified => "Notified",
            OrderState::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for OrderState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(OrderState::Created),
            "PaymentPending" => Ok(OrderState::PaymentPending),
            "PaymentSucceeded" => Ok(OrderState::PaymentSucceeded),
            "PaymentFailed" => Ok(OrderState::PaymentFailed),
            "InventoryReserving" => Ok(OrderState::InventoryReserving),
            "InsufficientStock" => Ok(OrderState::InsufficientStock),
            "Refunding" => Ok(OrderState::Refunding),
            "Refunded" => Ok(OrderState::Refunded),
            "Confirmed" => Ok(OrderState::Confirmed),
            "Notified" => Ok(OrderState::Notified),
            "Cancelled" => Ok(OrderState::Cancelled),
            other => Err(DomainError::UnknownState(other.to_string())),
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrderState; 11] = [
        OrderState::Created,
        OrderState::PaymentPending,
        OrderState::PaymentSucceeded,
        OrderState::PaymentFailed,
        OrderState::InventoryReserving,
        OrderState::InsufficientStock,
        OrderState::Refunding,
        OrderState::Refunded,
        OrderState::Confirmed,
        OrderState::Notified,
        OrderState::Cancelled,
    ];

    #[test]
    fn default_state_is_created() {
        assert_eq!(OrderState::default(), OrderState::Created);
    }

    #[test]
    fn terminal_states() {
        assert!(OrderState::PaymentFailed.is_terminal());
        assert!(OrderState::Refunded.is_terminal());
        assert!(OrderState::Notified.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());

        assert!(!OrderState::Created.is_terminal());
        assert!(!OrderState::PaymentPending.is_terminal());
        assert!(!OrderState::PaymentSucceeded.is_terminal());
        assert!(!OrderState::InventoryReserving.is_terminal());
        assert!(!OrderState::InsufficientStock.is_terminal());
        assert!(!OrderState::Refunding.is_terminal());
        assert!(!OrderState::Confirmed.is_terminal());
    }

    #[test]
    fn cancellation_only_before_payment_captured() {
        assert!(OrderState::Created.can_cancel());
        assert!(OrderState::PaymentPending.can_cancel());

        assert!(!OrderState::PaymentSucceeded.can_cancel());
        assert!(!OrderState::InventoryReserving.can_cancel());
        assert!(!OrderState::Confirmed.can_cancel());
        assert!(!OrderState::Notified.can_cancel());
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to} should be illegal");
            }
        }
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        assert!(OrderState::Created.can_transition_to(OrderState::PaymentPending));
        assert!(OrderState::PaymentPending.can_transition_to(OrderState::PaymentSucceeded));
        assert!(OrderState::PaymentSucceeded.can_transition_to(OrderState::InventoryReserving));
        assert!(OrderState::InventoryReserving.can_transition_to(OrderState::Confirmed));
        assert!(OrderState::Confirmed.can_transition_to(OrderState::Notified));
    }

    #[test]
    fn compensation_path_transitions_are_legal() {
        assert!(OrderState::InventoryReserving.can_transition_to(OrderState::InsufficientStock));
        assert!(OrderState::InsufficientStock.can_transition_to(OrderState::Refunding));
        assert!(OrderState::Refunding.can_transition_to(OrderState::Refunded));
    }

    #[test]
    fn skipping_states_is_illegal() {
        assert!(!OrderState::Created.can_transition_to(OrderState::PaymentSucceeded));
        assert!(!OrderState::PaymentSucceeded.can_transition_to(OrderState::Confirmed));
        assert!(!OrderState::PaymentPending.can_transition_to(OrderState::Notified));
    }

    #[test]
    fn state_string_roundtrip() {
        for state in ALL {
            let parsed: OrderState = state.as_str().parse().unwrap();
            assert_eq!(parsed, state);
        }
        assert!("Shipped".parse::<OrderState>().is_err());
    }

    #[test]
    fn serialization_roundtrip() {
        let state = OrderState::InventoryReserving;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: OrderState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
