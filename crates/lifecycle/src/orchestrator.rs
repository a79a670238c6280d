//! The order lifecycle orchestrator.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ProductId};
use domain::{Order, OrderError, OrderItem, OrderStatus};
use store::{NewOrder, NewOrderItem, OrderStore, OrderWithItems, ProductStore};

use crate::error::{LifecycleError, Result};

/// Drives orders through the status state machine.
///
/// The orchestrator is the only component that writes order statuses, and
/// the only caller of the stock ledger during a transition. Stores are
/// injected at construction, so the orchestrator holds no process-wide
/// state and runs against any backend pair (Postgres in production, the
/// in-memory store in tests).
pub struct OrderLifecycle<O, P>
where
    O: OrderStore,
    P: ProductStore,
{
    orders: O,
    products: P,
}

impl<O, P> OrderLifecycle<O, P>
where
    O: OrderStore,
    P: ProductStore,
{
    /// Creates a new orchestrator over the given stores.
    pub fn new(orders: O, products: P) -> Self {
        Self { orders, products }
    }

    /// Returns true if the state machine permits moving from `current` to
    /// `requested`.
    ///
    /// Pure check, exposed for validation and UI hinting; calling it does
    /// not touch storage.
    pub fn can_transition(current: OrderStatus, requested: OrderStatus) -> bool {
        current.can_transition(requested)
    }

    /// Creates an order in `Draft` status.
    #[tracing::instrument(skip(self, order))]
    pub async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let created = self.orders.create(order).await?;
        tracing::info!(order_id = %created.id, "order created");
        Ok(created)
    }

    /// Loads an order together with its items.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<OrderWithItems> {
        self.orders
            .find_by_id_with_items(order_id)
            .await?
            .ok_or(LifecycleError::OrderNotFound(order_id))
    }

    /// Moves an order to `requested`, reserving stock when required.
    ///
    /// The legality check runs before anything is written; a denied
    /// transition mutates nothing. Entering `PaymentPending` reserves every
    /// line item's stock and persists the new status inside one storage
    /// transaction — on failure the order and all product counters are left
    /// exactly as they were. All other legal transitions are a plain status
    /// write.
    #[tracing::instrument(skip(self))]
    pub async fn transition_status(
        &self,
        order_id: OrderId,
        requested: OrderStatus,
    ) -> Result<Order> {
        metrics::counter!("order_transitions_total").increment(1);

        let loaded = self.get_order(order_id).await?;
        loaded.order.ensure_transition(requested)?;

        let order = if requested == OrderStatus::PaymentPending {
            let demands = loaded.demands();
            self.orders
                .set_status_reserving_stock(order_id, requested, &demands)
                .await?
        } else {
            self.orders.set_status(order_id, requested).await?
        };

        tracing::info!(
            %order_id,
            from = %loaded.order.status,
            to = %requested,
            "order status transition"
        );

        Ok(order)
    }

    /// Updates the order's fulfillment date. Draft-only.
    #[tracing::instrument(skip(self))]
    pub async fn reschedule(
        &self,
        order_id: OrderId,
        placed_at: Option<DateTime<Utc>>,
    ) -> Result<Order> {
        let loaded = self.get_order(order_id).await?;
        loaded.order.ensure_modifiable("reschedule the order")?;

        Ok(self.orders.set_placed_at(order_id, placed_at).await?)
    }

    /// Deletes an order and its items.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId) -> Result<()> {
        self.orders.delete(order_id).await?;
        tracing::info!(%order_id, "order deleted");
        Ok(())
    }

    /// Adds a line item to a draft order.
    ///
    /// The product must exist, belong to the order's seller, and not
    /// already appear in the order.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<OrderItem> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity }.into());
        }

        let loaded = self.get_order(order_id).await?;

        let product = self
            .products
            .find_by_id(product_id)
            .await?
            .ok_or(LifecycleError::ProductNotFound(product_id))?;

        if product.owner_id != loaded.order.seller_id {
            return Err(OrderError::SellerMismatch { product_id }.into());
        }

        loaded.order.ensure_modifiable("add an item")?;

        Ok(self
            .orders
            .add_item(NewOrderItem {
                order_id,
                product_id,
                quantity,
            })
            .await?)
    }

    /// Changes a line item's quantity. Draft-only.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        item_id: OrderItemId,
        quantity: u32,
    ) -> Result<OrderItem> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity }.into());
        }

        let item = self
            .orders
            .find_item(item_id)
            .await?
            .ok_or(LifecycleError::ItemNotFound(item_id))?;

        let loaded = self.get_order(item.order_id).await?;
        loaded.order.ensure_modifiable("update an item")?;

        Ok(self.orders.update_item_quantity(item_id, quantity).await?)
    }

    /// Removes a line item. Draft-only.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, item_id: OrderItemId) -> Result<()> {
        let item = self
            .orders
            .find_item(item_id)
            .await?
            .ok_or(LifecycleError::ItemNotFound(item_id))?;

        let loaded = self.get_order(item.order_id).await?;
        loaded.order.ensure_modifiable("remove an item")?;

        Ok(self.orders.remove_item(item_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserId;
    use domain::Product;
    use store::InMemoryStore;

    fn lifecycle() -> (OrderLifecycle<InMemoryStore, InMemoryStore>, InMemoryStore) {
        let store = InMemoryStore::new();
        (OrderLifecycle::new(store.clone(), store.clone()), store)
    }

    fn seed_product(store: &InMemoryStore, owner_id: UserId, stock: i64) -> ProductId {
        let product = Product {
            id: ProductId::new(),
            owner_id,
            stock,
            available: stock > 0,
        };
        let id = product.id;
        store.insert_product(product);
        id
    }

    async fn draft_order(
        lifecycle: &OrderLifecycle<InMemoryStore, InMemoryStore>,
    ) -> (OrderId, UserId) {
        let seller_id = UserId::new();
        let order = lifecycle
            .create_order(NewOrder {
                user_id: UserId::new(),
                seller_id,
                placed_at: None,
            })
            .await
            .unwrap();
        (order.id, seller_id)
    }

    #[tokio::test]
    async fn create_order_starts_in_draft() {
        let (lifecycle, _) = lifecycle();
        let (order_id, _) = draft_order(&lifecycle).await;

        let loaded = lifecycle.get_order(order_id).await.unwrap();
        assert_eq!(loaded.order.status, OrderStatus::Draft);
    }

    #[tokio::test]
    async fn transition_follows_the_table() {
        let (lifecycle, _) = lifecycle();
        let (order_id, _) = draft_order(&lifecycle).await;

        let order = lifecycle
            .transition_status(order_id, OrderStatus::AwaitingAvailability)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::AwaitingAvailability);
    }

    #[tokio::test]
    async fn skipping_states_is_denied_without_mutation() {
        let (lifecycle, _) = lifecycle();
        let (order_id, _) = draft_order(&lifecycle).await;

        let err = lifecycle
            .transition_status(order_id, OrderStatus::Processing)
            .await
            .unwrap_err();
        match err {
            LifecycleError::Order(OrderError::InvalidTransition { from, to }) => {
                assert_eq!(from, OrderStatus::Draft);
                assert_eq!(to, OrderStatus::Processing);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }

        let loaded = lifecycle.get_order(order_id).await.unwrap();
        assert_eq!(loaded.order.status, OrderStatus::Draft);
    }

    #[tokio::test]
    async fn transition_on_missing_order_fails() {
        let (lifecycle, _) = lifecycle();
        let missing = OrderId::new();

        let err = lifecycle
            .transition_status(missing, OrderStatus::AwaitingAvailability)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::OrderNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn can_transition_is_pure() {
        assert!(OrderLifecycle::<InMemoryStore, InMemoryStore>::can_transition(
            OrderStatus::Draft,
            OrderStatus::AwaitingAvailability
        ));
        assert!(!OrderLifecycle::<InMemoryStore, InMemoryStore>::can_transition(
            OrderStatus::Draft,
            OrderStatus::Draft
        ));
    }

    #[tokio::test]
    async fn add_item_rejects_zero_quantity() {
        let (lifecycle, store) = lifecycle();
        let (order_id, seller_id) = draft_order(&lifecycle).await;
        let product_id = seed_product(&store, seller_id, 10);

        let err = lifecycle.add_item(order_id, product_id, 0).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Order(OrderError::InvalidQuantity { quantity: 0 })
        ));
    }

    #[tokio::test]
    async fn add_item_rejects_missing_product() {
        let (lifecycle, _) = lifecycle();
        let (order_id, _) = draft_order(&lifecycle).await;
        let missing = ProductId::new();

        let err = lifecycle.add_item(order_id, missing, 1).await.unwrap_err();
        assert!(matches!(err, LifecycleError::ProductNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn add_item_rejects_other_sellers_product() {
        let (lifecycle, store) = lifecycle();
        let (order_id, _) = draft_order(&lifecycle).await;
        let product_id = seed_product(&store, UserId::new(), 10);

        let err = lifecycle.add_item(order_id, product_id, 1).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Order(OrderError::SellerMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn add_item_rejects_duplicate_product() {
        let (lifecycle, store) = lifecycle();
        let (order_id, seller_id) = draft_order(&lifecycle).await;
        let product_id = seed_product(&store, seller_id, 10);

        lifecycle.add_item(order_id, product_id, 1).await.unwrap();
        let err = lifecycle.add_item(order_id, product_id, 2).await.unwrap_err();
        assert!(matches!(err, LifecycleError::DuplicateItem { .. }));
    }

    #[tokio::test]
    async fn items_are_locked_outside_draft() {
        let (lifecycle, store) = lifecycle();
        let (order_id, seller_id) = draft_order(&lifecycle).await;
        let product_id = seed_product(&store, seller_id, 10);
        let other_product = seed_product(&store, seller_id, 10);

        let item = lifecycle.add_item(order_id, product_id, 1).await.unwrap();
        lifecycle
            .transition_status(order_id, OrderStatus::AwaitingAvailability)
            .await
            .unwrap();

        let err = lifecycle
            .add_item(order_id, other_product, 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Order(OrderError::InvalidState { .. })
        ));

        let err = lifecycle.update_item_quantity(item.id, 5).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Order(OrderError::InvalidState { .. })
        ));

        let err = lifecycle.remove_item(item.id).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Order(OrderError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn reschedule_is_draft_only() {
        let (lifecycle, _) = lifecycle();
        let (order_id, _) = draft_order(&lifecycle).await;

        let when = Utc::now();
        let order = lifecycle.reschedule(order_id, Some(when)).await.unwrap();
        assert_eq!(order.placed_at, Some(when));

        lifecycle
            .transition_status(order_id, OrderStatus::AwaitingAvailability)
            .await
            .unwrap();

        let err = lifecycle.reschedule(order_id, None).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Order(OrderError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn delete_order_removes_items() {
        let (lifecycle, store) = lifecycle();
        let (order_id, seller_id) = draft_order(&lifecycle).await;
        let product_id = seed_product(&store, seller_id, 10);

        let item = lifecycle.add_item(order_id, product_id, 1).await.unwrap();
        lifecycle.delete_order(order_id).await.unwrap();

        let err = lifecycle.get_order(order_id).await.unwrap_err();
        assert!(matches!(err, LifecycleError::OrderNotFound(_)));

        let err = lifecycle.update_item_quantity(item.id, 2).await.unwrap_err();
        assert!(matches!(err, LifecycleError::ItemNotFound(_)));
    }
}
