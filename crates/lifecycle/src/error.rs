//! Orchestrator error types.

use common::{OrderId, OrderItemId, ProductId};
use domain::OrderError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during lifecycle operations.
///
/// Every variant except `Storage` is an expected, recoverable-by-the-caller
/// condition; none trigger internal retries, since retrying a denied
/// transition or an insufficient-stock failure without new input cannot
/// succeed. `Storage` carries unexpected database faults; the underlying
/// transaction is guaranteed to have been rolled back.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The line item does not exist.
    #[error("order item not found: {0}")]
    ItemNotFound(OrderItemId),

    /// The product already appears in the order.
    #[error("product {product_id} is already in order {order_id}")]
    DuplicateItem {
        order_id: OrderId,
        product_id: ProductId,
    },

    /// The reservation was denied; no stock changed and the order status is
    /// untouched. Carries the first failing product and the shortfall so the
    /// caller can show actionable feedback without another round trip.
    #[error(
        "insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// Domain rule violation (denied transition, draft-only mutation, ...).
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Unexpected storage fault.
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(id) => LifecycleError::OrderNotFound(id),
            StoreError::ProductNotFound(id) => LifecycleError::ProductNotFound(id),
            StoreError::ItemNotFound(id) => LifecycleError::ItemNotFound(id),
            StoreError::DuplicateItem {
                order_id,
                product_id,
            } => LifecycleError::DuplicateItem {
                order_id,
                product_id,
            },
            StoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => LifecycleError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            other => LifecycleError::Storage(other),
        }
    }
}

/// Convenience type alias for lifecycle results.
pub type Result<T> = std::result::Result<T, LifecycleError>;
