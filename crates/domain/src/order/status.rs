//! Order status state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Draft ──► AwaitingAvailability ──┬──► PaymentPending ──► Processing ──► Shipped ──► Received
///                                  │
///                                  └──► CancelledBySeller
/// ```
///
/// The lifecycle is strictly forward-moving: there are no back-edges and no
/// self-transitions. `CancelledBySeller` and `Received` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order is being assembled by the buyer; items can be added/removed.
    #[default]
    Draft,

    /// Submitted to the seller, waiting for an availability decision.
    AwaitingAvailability,

    /// The seller declined the order (terminal state).
    CancelledBySeller,

    /// Stock has been reserved, awaiting payment.
    PaymentPending,

    /// Payment confirmed, the order is being fulfilled.
    Processing,

    /// Handed to the carrier.
    Shipped,

    /// Delivered to the buyer (terminal state).
    Received,
}

impl OrderStatus {
    /// All seven statuses, in forward lifecycle order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Draft,
        OrderStatus::AwaitingAvailability,
        OrderStatus::CancelledBySeller,
        OrderStatus::PaymentPending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Received,
    ];

    /// Returns the statuses this status may transition to.
    ///
    /// The relation is closed: anything not returned here is denied.
    pub fn successors(self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Draft => &[OrderStatus::AwaitingAvailability],
            OrderStatus::AwaitingAvailability => {
                &[OrderStatus::PaymentPending, OrderStatus::CancelledBySeller]
            }
            OrderStatus::CancelledBySeller => &[],
            OrderStatus::PaymentPending => &[OrderStatus::Processing],
            OrderStatus::Processing => &[OrderStatus::Shipped],
            OrderStatus::Shipped => &[OrderStatus::Received],
            OrderStatus::Received => &[],
        }
    }

    /// Returns true if the transition from `self` to `requested` is permitted.
    ///
    /// Pure and side-effect free; safe to call concurrently. Self-transitions
    /// are never permitted.
    pub fn can_transition(self, requested: OrderStatus) -> bool {
        self.successors().contains(&requested)
    }

    /// Returns true if this is a terminal status (no outgoing transitions).
    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    /// Returns true if order fields and items can be modified in this status.
    pub fn can_modify_items(self) -> bool {
        matches!(self, OrderStatus::Draft)
    }

    /// Returns the wire code for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Draft => "DRAFT",
            OrderStatus::AwaitingAvailability => "AWAITING_AVAILABILITY",
            OrderStatus::CancelledBySeller => "CANCELLED_BY_SELLER",
            OrderStatus::PaymentPending => "PAYMENT_PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Received => "RECEIVED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unrecognized status code.
///
/// Wire representations must round-trip losslessly; codes outside the seven
/// defined values are rejected rather than mapped to a default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status code: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_draft() {
        assert_eq!(OrderStatus::default(), OrderStatus::Draft);
    }

    #[test]
    fn transition_table_matches_lifecycle() {
        use OrderStatus::*;

        assert!(Draft.can_transition(AwaitingAvailability));
        assert!(AwaitingAvailability.can_transition(PaymentPending));
        assert!(AwaitingAvailability.can_transition(CancelledBySeller));
        assert!(PaymentPending.can_transition(Processing));
        assert!(Processing.can_transition(Shipped));
        assert!(Shipped.can_transition(Received));
    }

    #[test]
    fn everything_not_in_the_table_is_denied() {
        use OrderStatus::*;

        let allowed: &[(OrderStatus, OrderStatus)] = &[
            (Draft, AwaitingAvailability),
            (AwaitingAvailability, PaymentPending),
            (AwaitingAvailability, CancelledBySeller),
            (PaymentPending, Processing),
            (Processing, Shipped),
            (Shipped, Received),
        ];

        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition(to),
                    expected,
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn self_transitions_are_denied() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition(status), "{status} -> {status}");
        }
    }

    #[test]
    fn terminal_statuses_have_no_successors() {
        assert!(OrderStatus::CancelledBySeller.is_terminal());
        assert!(OrderStatus::Received.is_terminal());

        for status in OrderStatus::ALL {
            if !status.is_terminal() {
                assert!(!status.successors().is_empty());
            }
        }
    }

    #[test]
    fn only_draft_is_modifiable() {
        for status in OrderStatus::ALL {
            assert_eq!(status.can_modify_items(), status == OrderStatus::Draft);
        }
    }

    #[test]
    fn can_transition_is_idempotent() {
        // Pure function: repeated calls with the same arguments agree.
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let first = from.can_transition(to);
                for _ in 0..3 {
                    assert_eq!(from.can_transition(to), first);
                }
            }
        }
    }

    #[test]
    fn wire_codes_roundtrip() {
        for status in OrderStatus::ALL {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn unknown_wire_codes_are_rejected() {
        for code in ["", "draft", "REFUNDED", "PAYMENT PENDING", "RECIBIDO"] {
            let err = code.parse::<OrderStatus>().unwrap_err();
            assert_eq!(err, UnknownStatus(code.to_string()));
        }
    }

    #[test]
    fn serde_uses_wire_codes() {
        let json = serde_json::to_string(&OrderStatus::PaymentPending).unwrap();
        assert_eq!(json, "\"PAYMENT_PENDING\"");

        let parsed: OrderStatus = serde_json::from_str("\"CANCELLED_BY_SELLER\"").unwrap();
        assert_eq!(parsed, OrderStatus::CancelledBySeller);

        assert!(serde_json::from_str::<OrderStatus>("\"PENDING\"").is_err());
    }

    #[test]
    fn display_matches_wire_code() {
        assert_eq!(OrderStatus::Draft.to_string(), "DRAFT");
        assert_eq!(
            OrderStatus::AwaitingAvailability.to_string(),
            "AWAITING_AVAILABILITY"
        );
    }
}
