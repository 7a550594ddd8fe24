//! Order repository.
//!
//! Orders are read in two queries: the order rows with their buyer, then
//! every cart line for those orders with the product populated. Products
//! deleted since checkout drop out of the line list.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{Buyer, Order, OrderId, OrderStatus, Product, UserId};

use super::RepositoryError;
use super::products::{PRODUCT_COLUMNS, ProductRow};
use crate::models::NewOrder;

/// Storage for placed orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Record an order with status `Not Process`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the buyer or a product does not exist.
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// A buyer's orders, newest first.
    async fn list_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Every order, newest first.
    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Set an order's status and return the updated order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID.
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    payment: serde_json::Value,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    buyer_id: UserId,
    buyer_name: String,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_id: OrderId,
    #[sqlx(flatten)]
    product: ProductRow,
}

const ORDER_SELECT: &str = r"
    SELECT o.id, o.payment, o.status, o.created_at, o.updated_at,
           u.id AS buyer_id, u.name AS buyer_name
    FROM orders o
    JOIN users u ON u.id = o.buyer_id
";

/// `PostgreSQL`-backed [`OrderRepository`].
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach cart lines to order rows, preserving row order.
    async fn populate(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let sql = format!(
            "SELECT op.order_id, {PRODUCT_COLUMNS} \
             FROM order_products op \
             JOIN products p ON p.id = op.product_id \
             JOIN categories c ON c.id = p.category_id \
             WHERE op.order_id = ANY($1) \
             ORDER BY op.order_id, op.position"
        );
        let lines = sqlx::query_as::<_, OrderLineRow>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        let mut products: HashMap<OrderId, Vec<Product>> = HashMap::new();
        for line in lines {
            products
                .entry(line.order_id)
                .or_default()
                .push(line.product.try_into()?);
        }

        rows.into_iter()
            .map(|row| {
                let status = row.status.parse::<OrderStatus>().map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
                })?;
                Ok(Order {
                    id: row.id,
                    products: products.remove(&row.id).unwrap_or_default(),
                    payment: row.payment,
                    buyer: Buyer {
                        id: row.buyer_id,
                        name: row.buyer_name,
                    },
                    status,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                })
            })
            .collect()
    }

    async fn fetch_required(&self, id: OrderId) -> Result<Order, RepositoryError> {
        let sql = format!("{ORDER_SELECT} WHERE o.id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        self.populate(vec![row])
            .await?
            .pop()
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: OrderId =
            sqlx::query_scalar("INSERT INTO orders (buyer_id, payment) VALUES ($1, $2) RETURNING id")
                .bind(order.buyer)
                .bind(&order.payment)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| RepositoryError::from_write(e, "buyer does not exist"))?;

        let positions: Vec<i32> = (0..).take(order.products.len()).collect();
        sqlx::query(
            r"
            INSERT INTO order_products (order_id, position, product_id)
            SELECT $1, line.position, line.product_id
            FROM UNNEST($2::int4[], $3::int4[]) AS line(position, product_id)
            ",
        )
        .bind(id)
        .bind(&positions)
        .bind(&order.products)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product does not exist"))?;

        tx.commit().await?;

        self.fetch_required(id).await
    }

    async fn list_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} WHERE o.buyer_id = $1 ORDER BY o.created_at DESC, o.id DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(buyer)
            .fetch_all(&self.pool)
            .await?;
        self.populate(rows).await
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} ORDER BY o.created_at DESC, o.id DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        self.populate(rows).await
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.fetch_required(id).await
    }
}
