//! In-memory store implementation for testing and embedded use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ProductId};
use domain::{Order, OrderItem, OrderStatus, Product};

use crate::{
    NewOrder, NewOrderItem, OrderStore, OrderWithItems, ProductStore, Result, StockDemand,
    StoreError,
};

#[derive(Debug, Default)]
struct InMemoryState {
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderItemId, OrderItem>,
    products: HashMap<ProductId, Product>,
}

impl InMemoryState {
    /// Verifies and applies a demand batch, or applies nothing.
    ///
    /// Demands are verified against a running per-product debit tally before
    /// any write, so a batch that names the same product twice cannot
    /// oversell. The single lock around the state serializes concurrent
    /// batches, giving the same observable contract as the Postgres
    /// transaction.
    fn reserve(&mut self, demands: &[StockDemand]) -> Result<()> {
        let mut debits: HashMap<ProductId, i64> = HashMap::new();

        for demand in demands {
            let requested = i64::from(demand.quantity);
            let product = self
                .products
                .get(&demand.product_id)
                .ok_or(StoreError::ProductNotFound(demand.product_id))?;

            let debit = debits.entry(demand.product_id).or_insert(0);
            let available = product.stock - *debit;

            if available < requested {
                return Err(StoreError::InsufficientStock {
                    product_id: demand.product_id,
                    available,
                    requested,
                });
            }

            *debit += requested;
        }

        for (product_id, debit) in debits {
            if let Some(product) = self.products.get_mut(&product_id) {
                product.stock -= debit;
                product.available = product.stock > 0;
            }
        }

        Ok(())
    }
}

/// In-memory order and product store.
///
/// Holds all records behind a single mutex and provides the same interface
/// and atomicity guarantees as the PostgreSQL implementation. Cloning is
/// cheap; all clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a product record, replacing any existing one with the same id.
    pub fn insert_product(&self, product: Product) {
        self.state
            .lock()
            .unwrap()
            .products
            .insert(product.id, product);
    }

    /// Seeds an order record, replacing any existing one with the same id.
    pub fn insert_order(&self, order: Order) {
        self.state.lock().unwrap().orders.insert(order.id, order);
    }

    /// Clears all orders, items, and products.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.orders.clear();
        state.items.clear();
        state.products.clear();
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let record = Order {
            id: OrderId::new(),
            user_id: order.user_id,
            seller_id: order.seller_id,
            placed_at: order.placed_at,
            status: OrderStatus::Draft,
        };

        self.state
            .lock()
            .unwrap()
            .orders
            .insert(record.id, record.clone());

        Ok(record)
    }

    async fn find_by_id_with_items(&self, order_id: OrderId) -> Result<Option<OrderWithItems>> {
        let state = self.state.lock().unwrap();

        let Some(order) = state.orders.get(&order_id).cloned() else {
            return Ok(None);
        };

        let mut items: Vec<_> = state
            .items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id.as_uuid());

        Ok(Some(OrderWithItems { order, items }))
    }

    async fn find_items_by_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let state = self.state.lock().unwrap();

        let mut items: Vec<_> = state
            .items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id.as_uuid());

        Ok(items)
    }

    async fn find_item(&self, item_id: OrderItemId) -> Result<Option<OrderItem>> {
        Ok(self.state.lock().unwrap().items.get(&item_id).cloned())
    }

    async fn set_placed_at(
        &self,
        order_id: OrderId,
        placed_at: Option<DateTime<Utc>>,
    ) -> Result<Order> {
        let mut state = self.state.lock().unwrap();

        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        order.placed_at = placed_at;

        Ok(order.clone())
    }

    async fn delete(&self, order_id: OrderId) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        if state.orders.remove(&order_id).is_none() {
            return Err(StoreError::OrderNotFound(order_id));
        }

        // Items cascade with their order.
        state.items.retain(|_, item| item.order_id != order_id);

        Ok(())
    }

    async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut state = self.state.lock().unwrap();

        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        order.status = status;

        Ok(order.clone())
    }

    async fn set_status_reserving_stock(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        demands: &[StockDemand],
    ) -> Result<Order> {
        let mut state = self.state.lock().unwrap();

        if !state.orders.contains_key(&order_id) {
            return Err(StoreError::OrderNotFound(order_id));
        }

        // Reserve first; it either applies the whole batch or touches
        // nothing, so the status write below never needs unwinding.
        state.reserve(demands)?;

        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        order.status = status;

        Ok(order.clone())
    }

    async fn add_item(&self, item: NewOrderItem) -> Result<OrderItem> {
        let mut state = self.state.lock().unwrap();

        if !state.orders.contains_key(&item.order_id) {
            return Err(StoreError::OrderNotFound(item.order_id));
        }

        if !state.products.contains_key(&item.product_id) {
            return Err(StoreError::ProductNotFound(item.product_id));
        }

        let duplicate = state
            .items
            .values()
            .any(|existing| existing.order_id == item.order_id && existing.product_id == item.product_id);
        if duplicate {
            return Err(StoreError::DuplicateItem {
                order_id: item.order_id,
                product_id: item.product_id,
            });
        }

        let record = OrderItem {
            id: OrderItemId::new(),
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
        };
        state.items.insert(record.id, record.clone());

        Ok(record)
    }

    async fn update_item_quantity(&self, item_id: OrderItemId, quantity: u32) -> Result<OrderItem> {
        let mut state = self.state.lock().unwrap();

        let item = state
            .items
            .get_mut(&item_id)
            .ok_or(StoreError::ItemNotFound(item_id))?;
        item.quantity = quantity;

        Ok(item.clone())
    }

    async fn remove_item(&self, item_id: OrderItemId) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        if state.items.remove(&item_id).is_none() {
            return Err(StoreError::ItemNotFound(item_id));
        }

        Ok(())
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn find_by_id(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().unwrap().products.get(&product_id).cloned())
    }

    async fn get_stock(&self, product_id: ProductId) -> Result<Option<i64>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .products
            .get(&product_id)
            .map(|product| product.stock))
    }

    async fn reserve(&self, demands: &[StockDemand]) -> Result<()> {
        self.state.lock().unwrap().reserve(demands)
    }

    async fn restock(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        let mut state = self.state.lock().unwrap();

        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(StoreError::ProductNotFound(product_id))?;
        product.stock += i64::from(quantity);
        product.available = product.stock > 0;

        Ok(product.clone())
    }
}
