//! Core records for orders, line items, and products.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderStatus};

/// A buyer's order, tracked through the status lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,

    /// The buyer who placed the order.
    pub user_id: UserId,

    /// The seller the order is addressed to.
    pub seller_id: UserId,

    /// Requested fulfillment date; may be unset at creation.
    pub placed_at: Option<DateTime<Utc>>,

    /// Current lifecycle status. Never null; new orders start in `Draft`.
    pub status: OrderStatus,
}

impl Order {
    /// Checks that the state machine permits moving to `requested`.
    pub fn ensure_transition(&self, requested: OrderStatus) -> Result<(), OrderError> {
        if self.status.can_transition(requested) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                from: self.status,
                to: requested,
            })
        }
    }

    /// Checks that the order is still in its draft phase.
    ///
    /// Order fields and the item list may only change while the order is in
    /// `Draft`; `action` names the attempted mutation for diagnostics.
    pub fn ensure_modifiable(&self, action: &'static str) -> Result<(), OrderError> {
        if self.status.can_modify_items() {
            Ok(())
        } else {
            Err(OrderError::InvalidState {
                status: self.status,
                action,
            })
        }
    }

    /// Returns true if the order has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A (product, quantity) line within an order.
///
/// A product appears at most once per order; quantities are always at
/// least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Unique item identifier.
    pub id: OrderItemId,

    /// The owning order.
    pub order_id: OrderId,

    /// The referenced product.
    pub product_id: ProductId,

    /// Quantity ordered (>= 1).
    pub quantity: u32,
}

/// A seller-owned product, consumed here for its stock counter.
///
/// The rest of the product record (name, description, price) belongs to the
/// product-catalog collaborator and is not loaded by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,

    /// The seller who owns the product.
    pub owner_id: UserId,

    /// Units in stock. Never negative, including under concurrent decrements.
    pub stock: i64,

    /// Derived flag: `stock > 0`, recomputed on every stock write.
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft_order() -> Order {
        Order {
            id: OrderId::new(),
            user_id: UserId::new(),
            seller_id: UserId::new(),
            placed_at: None,
            status: OrderStatus::Draft,
        }
    }

    #[test]
    fn ensure_transition_allows_table_edges() {
        let order = draft_order();
        assert!(order
            .ensure_transition(OrderStatus::AwaitingAvailability)
            .is_ok());
    }

    #[test]
    fn ensure_transition_denies_skipping_states() {
        let order = draft_order();
        let err = order.ensure_transition(OrderStatus::Processing).unwrap_err();
        match err {
            OrderError::InvalidTransition { from, to } => {
                assert_eq!(from, OrderStatus::Draft);
                assert_eq!(to, OrderStatus::Processing);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn ensure_transition_denies_everything_from_terminal() {
        let mut order = draft_order();
        order.status = OrderStatus::Received;
        assert!(order.is_terminal());

        for requested in OrderStatus::ALL {
            assert!(order.ensure_transition(requested).is_err());
        }
    }

    #[test]
    fn ensure_modifiable_only_in_draft() {
        let mut order = draft_order();
        assert!(order.ensure_modifiable("add item").is_ok());

        order.status = OrderStatus::AwaitingAvailability;
        let err = order.ensure_modifiable("add item").unwrap_err();
        match err {
            OrderError::InvalidState { status, action } => {
                assert_eq!(status, OrderStatus::AwaitingAvailability);
                assert_eq!(action, "add item");
            }
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[test]
    fn order_serialization_roundtrip() {
        let order = draft_order();
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }
}
