//! Order records and the status state machine.

mod model;
mod status;

pub use model::{Order, OrderItem, Product};
pub use status::{OrderStatus, UnknownStatus};

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The state machine denied the requested status change.
    #[error("invalid transition: cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A draft-only mutation was attempted against a non-draft order.
    #[error("cannot {action} while the order is in {status} state")]
    InvalidState {
        status: OrderStatus,
        action: &'static str,
    },

    /// Invalid item quantity.
    #[error("invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// The product is owned by a seller other than the order's seller.
    #[error("product {product_id} belongs to a different seller")]
    SellerMismatch { product_id: ProductId },
}
