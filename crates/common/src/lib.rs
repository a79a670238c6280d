//! Shared types for the marketplace order backend.

pub mod types;

pub use types::{OrderId, OrderItemId, ProductId, UserId};
