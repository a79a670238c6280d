use common::{OrderId, OrderItemId, ProductId};
use domain::UnknownStatus;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
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

    /// A reservation batch demanded more units than are in stock.
    /// The whole batch was rolled back; no stock changed.
    #[error(
        "insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// A stored status code did not parse back to a known status.
    #[error("corrupt status code in storage: {0}")]
    UnknownStatus(#[from] UnknownStatus),

    /// An unexpected database fault. The surrounding transaction, if any,
    /// has been rolled back.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
