//! Product storage trait: the inventory ledger.

use async_trait::async_trait;
use common::ProductId;
use domain::Product;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A single (product, quantity) demand within a reservation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDemand {
    /// The product to debit.
    pub product_id: ProductId,
    /// Units to debit (>= 1).
    pub quantity: u32,
}

/// Trait for product stock operations.
///
/// The ledger owns the only shared mutable resource in the system — product
/// stock counters — and every write goes through an atomic, store-enforced
/// path. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Loads a product.
    ///
    /// Returns None if the product doesn't exist.
    async fn find_by_id(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Reads a product's current stock.
    ///
    /// Returns None if the product doesn't exist.
    async fn get_stock(&self, product_id: ProductId) -> Result<Option<i64>>;

    /// Atomically reserves the whole batch, or reserves nothing.
    ///
    /// Every demand is verified and decremented within one unit of work.
    /// The first failing demand aborts the batch with
    /// [`crate::StoreError::ProductNotFound`] or
    /// [`crate::StoreError::InsufficientStock`] and rolls back any decrement
    /// already applied — a returned error guarantees zero net stock change.
    /// Concurrent batches against the same product are serialized by the
    /// store; two batches that would jointly oversell can never both succeed.
    async fn reserve(&self, demands: &[StockDemand]) -> Result<()>;

    /// Atomically adds units to a product's stock and returns the updated
    /// record. `available` is recomputed in the same write.
    async fn restock(&self, product_id: ProductId, quantity: u32) -> Result<Product>;
}
