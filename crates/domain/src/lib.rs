//! Domain layer for the marketplace order backend.
//!
//! This crate provides the pure core of the system:
//! - The order status state machine (a closed transition table, no I/O)
//! - The `Order`, `OrderItem`, and `Product` records
//! - Domain error types for denied transitions and draft-only rules

pub mod order;

pub use order::{Order, OrderError, OrderItem, OrderStatus, Product, UnknownStatus};
