//! Order and line-item storage trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ProductId, UserId};
use domain::{Order, OrderItem, OrderStatus};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::products::StockDemand;

/// Data for creating an order.
///
/// The store assigns the identifier and forces the initial status to
/// [`OrderStatus::Draft`] regardless of caller input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// The buyer placing the order.
    pub user_id: UserId,
    /// The seller the order is addressed to.
    pub seller_id: UserId,
    /// Optional requested fulfillment date.
    pub placed_at: Option<DateTime<Utc>>,
}

/// Data for adding a line item to an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    /// The owning order.
    pub order_id: OrderId,
    /// The referenced product.
    pub product_id: ProductId,
    /// Quantity ordered (>= 1, validated by the caller).
    pub quantity: u32,
}

/// An order loaded together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderWithItems {
    /// Builds the stock-demand batch for this order's items.
    pub fn demands(&self) -> Vec<StockDemand> {
        self.items
            .iter()
            .map(|item| StockDemand {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect()
    }
}

/// Trait for order and line-item persistence.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Creates an order in `Draft` status and returns the stored record.
    async fn create(&self, order: NewOrder) -> Result<Order>;

    /// Loads an order together with its items.
    ///
    /// Returns None if the order doesn't exist.
    async fn find_by_id_with_items(&self, order_id: OrderId) -> Result<Option<OrderWithItems>>;

    /// Loads the line items of an order.
    async fn find_items_by_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Loads a single line item.
    ///
    /// Returns None if the item doesn't exist.
    async fn find_item(&self, item_id: OrderItemId) -> Result<Option<OrderItem>>;

    /// Updates the order's fulfillment date and returns the updated record.
    async fn set_placed_at(
        &self,
        order_id: OrderId,
        placed_at: Option<DateTime<Utc>>,
    ) -> Result<Order>;

    /// Deletes an order and, with it, all of its line items.
    async fn delete(&self, order_id: OrderId) -> Result<()>;

    /// Persists a new status for the order and returns the updated record.
    ///
    /// Transition legality is the orchestrator's concern; this is a plain
    /// durable write.
    async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order>;

    /// Reserves every demand and persists the new status as one unit of work.
    ///
    /// Either all demands are decremented and the status is written, or
    /// nothing changes: a failed demand (missing product, short stock) or a
    /// missing order rolls the whole operation back. This backs the
    /// transition into `PaymentPending`.
    async fn set_status_reserving_stock(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        demands: &[StockDemand],
    ) -> Result<Order>;

    /// Adds a line item to an order.
    ///
    /// Fails with [`crate::StoreError::DuplicateItem`] if the order already
    /// contains the product.
    async fn add_item(&self, item: NewOrderItem) -> Result<OrderItem>;

    /// Updates a line item's quantity and returns the updated record.
    async fn update_item_quantity(&self, item_id: OrderItemId, quantity: u32) -> Result<OrderItem>;

    /// Removes a line item.
    async fn remove_item(&self, item_id: OrderItemId) -> Result<()>;
}
