//! Order lifecycle orchestration for the marketplace backend.
//!
//! This crate composes the pure status state machine (`domain`) with the
//! storage layer (`store`) and is the single entry point for moving an
//! order between statuses. The transition into `PaymentPending` reserves
//! stock for every line item and persists the new status as one atomic
//! unit of work: either the whole order is reserved and advanced, or
//! nothing changes.

pub mod error;
pub mod orchestrator;

pub use error::LifecycleError;
pub use orchestrator::OrderLifecycle;
