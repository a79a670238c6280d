//! PostgreSQL-backed store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ProductId, UserId};
use domain::{Order, OrderItem, OrderStatus, Product};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    NewOrder, NewOrderItem, OrderStore, OrderWithItems, ProductStore, Result, StockDemand,
    StoreError,
};

/// PostgreSQL-backed order and product store.
///
/// Cloning is cheap; all clones share the same connection pool. Stock
/// reservations are expressed as single conditional updates
/// (`... WHERE stock >= quantity`) so the check and the write are one
/// statement and no lock is held across round trips.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            placed_at: row.try_get("placed_at")?,
            status: status.parse::<OrderStatus>()?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        let quantity: i32 = row.try_get("quantity")?;

        Ok(OrderItem {
            id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: quantity as u32,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            owner_id: UserId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
            stock: row.try_get("stock")?,
            available: row.try_get("available")?,
        })
    }

    /// Applies every demand inside `tx`, or fails leaving `tx` poised for
    /// rollback.
    ///
    /// One conditional update per row: the decrement only fires where
    /// `stock >= quantity`, and an affected-row count of zero is
    /// disambiguated into "missing product" vs "short stock" with a
    /// follow-up read inside the same transaction.
    async fn reserve_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        demands: &[StockDemand],
    ) -> Result<()> {
        for demand in demands {
            let requested = i64::from(demand.quantity);

            let updated = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - $2, available = (stock - $2) > 0
                WHERE id = $1 AND stock >= $2
                "#,
            )
            .bind(demand.product_id.as_uuid())
            .bind(requested)
            .execute(&mut **tx)
            .await?;

            if updated.rows_affected() == 0 {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
                        .bind(demand.product_id.as_uuid())
                        .fetch_optional(&mut **tx)
                        .await?;

                tracing::debug!(
                    product_id = %demand.product_id,
                    ?available,
                    requested,
                    "reservation denied, rolling back batch"
                );

                return Err(match available {
                    None => StoreError::ProductNotFound(demand.product_id),
                    Some(available) => StoreError::InsufficientStock {
                        product_id: demand.product_id,
                        available,
                        requested,
                    },
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, seller_id, placed_at, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, seller_id, placed_at, status
            "#,
        )
        .bind(OrderId::new().as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.seller_id.as_uuid())
        .bind(order.placed_at)
        .bind(OrderStatus::Draft.as_str())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_order(row)
    }

    async fn find_by_id_with_items(&self, order_id: OrderId) -> Result<Option<OrderWithItems>> {
        let row = sqlx::query(
            "SELECT id, user_id, seller_id, placed_at, status FROM orders WHERE id = $1",
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let order = Self::row_to_order(row)?;
        let items = self.find_items_by_order(order_id).await?;

        Ok(Some(OrderWithItems { order, items }))
    }

    async fn find_items_by_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn find_item(&self, item_id: OrderItemId) -> Result<Option<OrderItem>> {
        let row =
            sqlx::query("SELECT id, order_id, product_id, quantity FROM order_items WHERE id = $1")
                .bind(item_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_item).transpose()
    }

    async fn set_placed_at(
        &self,
        order_id: OrderId,
        placed_at: Option<DateTime<Utc>>,
    ) -> Result<Order> {
        let row = sqlx::query(
            r#"
            UPDATE orders
            SET placed_at = $2
            WHERE id = $1
            RETURNING id, user_id, seller_id, placed_at, status
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(placed_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_order(row),
            None => Err(StoreError::OrderNotFound(order_id)),
        }
    }

    async fn delete(&self, order_id: OrderId) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order_id));
        }

        Ok(())
    }

    async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let row = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2
            WHERE id = $1
            RETURNING id, user_id, seller_id, placed_at, status
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_order(row),
            None => Err(StoreError::OrderNotFound(order_id)),
        }
    }

    async fn set_status_reserving_stock(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        demands: &[StockDemand],
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        Self::reserve_in_tx(&mut tx, demands).await?;

        let row = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2
            WHERE id = $1
            RETURNING id, user_id, seller_id, placed_at, status
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        // Any early return above drops the transaction and rolls the
        // decrements back with it.
        let order = match row {
            Some(row) => Self::row_to_order(row)?,
            None => return Err(StoreError::OrderNotFound(order_id)),
        };

        tx.commit().await?;
        Ok(order)
    }

    async fn add_item(&self, item: NewOrderItem) -> Result<OrderItem> {
        let row = sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING id, order_id, product_id, quantity
            "#,
        )
        .bind(OrderItemId::new().as_uuid())
        .bind(item.order_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.quantity as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // The (order_id, product_id) unique constraint is the source of
            // truth for "a product appears at most once per order".
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("order_items_order_product_unique")
            {
                return StoreError::DuplicateItem {
                    order_id: item.order_id,
                    product_id: item.product_id,
                };
            }
            StoreError::Database(e)
        })?;

        Self::row_to_item(row)
    }

    async fn update_item_quantity(&self, item_id: OrderItemId, quantity: u32) -> Result<OrderItem> {
        let row = sqlx::query(
            r#"
            UPDATE order_items
            SET quantity = $2
            WHERE id = $1
            RETURNING id, order_id, product_id, quantity
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(quantity as i32)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_item(row),
            None => Err(StoreError::ItemNotFound(item_id)),
        }
    }

    async fn remove_item(&self, item_id: OrderItemId) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM order_items WHERE id = $1")
            .bind(item_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(StoreError::ItemNotFound(item_id));
        }

        Ok(())
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn find_by_id(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT id, owner_id, stock, available FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn get_stock(&self, product_id: ProductId) -> Result<Option<i64>> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(stock)
    }

    async fn reserve(&self, demands: &[StockDemand]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::reserve_in_tx(&mut tx, demands).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn restock(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + $2, available = (stock + $2) > 0
            WHERE id = $1
            RETURNING id, owner_id, stock, available
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_product(row),
            None => Err(StoreError::ProductNotFound(product_id)),
        }
    }
}
