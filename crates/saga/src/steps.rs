//! Step and compensation name constants for execution reporting.

/// Step name: capture payment for the order.
pub const STEP_CAPTURE_PAYMENT: &str = "capture_payment";

/// Step name: reserve stock for every line item.
pub const STEP_RESERVE_INVENTORY: &str = "reserve_inventory";

/// Step name: notify the customer of the terminal state.
pub const STEP_NOTIFY_CUSTOMER: &str = "notify_customer";

/// Compensation name: release stock reserved for this order.
pub const COMP_RELEASE_INVENTORY: &str = "release_inventory";

/// Compensation name: refund the captured payment.
pub const COMP_REFUND_PAYMENT: &str = "refund_payment";
