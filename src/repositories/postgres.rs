//! PostgreSQL storage (sqlx).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem, ItemWrite, Order, OrderDetail, Product, Role, User};
use crate::domain::value_objects::{Money, Quantity, Version};
use crate::repositories::{CartRepository, OrderRepository, ProductRepository, RoleRepository, UserRepository};
use crate::{EcommerceError, Entity, Result};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(EcommerceError::storage)
    }

    async fn details_for(&self, order_ids: Vec<Uuid>) -> Result<HashMap<Uuid, Vec<OrderDetail>>> {
        let rows = sqlx::query_as::<_, OrderDetailRow>(
            "SELECT id, order_id, product_id, quantity, price FROM order_details WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;
        let mut grouped: HashMap<Uuid, Vec<OrderDetail>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id;
            grouped.entry(order_id).or_default().push(row.try_into()?);
        }
        Ok(grouped)
    }

    async fn assemble(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
        let mut details = self.details_for(rows.iter().map(|r| r.id).collect()).await?;
        Ok(rows.into_iter()
            .map(|r| Order::restore(r.id, r.user_id, r.status, r.order_date, details.remove(&r.id).unwrap_or_default()))
            .collect())
    }
}

// =============================================================================
// Rows
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: Decimal,
    description: String,
    image_url: String,
    category: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = EcommerceError;
    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Product {
            id: r.id, name: r.name, price: Money::new(r.price).map_err(EcommerceError::storage)?,
            description: r.description, image_url: r.image_url,
            category: r.category.parse().map_err(EcommerceError::storage)?,
            created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartRow { id: Uuid, user_id: String, saved_for_later: bool }

#[derive(sqlx::FromRow)]
struct CartItemRow {
    item_id: Uuid,
    quantity: i32,
    version: i64,
    #[sqlx(flatten)]
    product: ProductRow,
}

#[derive(sqlx::FromRow)]
struct OrderRow { id: Uuid, user_id: String, status: String, order_date: DateTime<Utc> }

#[derive(sqlx::FromRow)]
struct OrderDetailRow { id: Uuid, order_id: Uuid, product_id: Uuid, quantity: i32, price: Decimal }

impl TryFrom<OrderDetailRow> for OrderDetail {
    type Error = EcommerceError;
    fn try_from(r: OrderDetailRow) -> Result<Self> {
        Ok(OrderDetail {
            id: r.id, product_id: r.product_id,
            quantity: Quantity::new(r.quantity).map_err(EcommerceError::storage)?,
            price: Money::new(r.price).map_err(EcommerceError::storage)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow { id: Uuid, username: String, email: String, password_hash: String, roles: Vec<String>, created_at: DateTime<Utc> }

#[derive(sqlx::FromRow)]
struct RoleRow { id: Uuid, name: String }

const PRODUCT_COLUMNS: &str = "id, name, price, description, image_url, category, created_at, updated_at";

// =============================================================================
// Catalog
// =============================================================================

#[async_trait]
impl ProductRepository for PgStore {
    async fn insert(&self, p: &Product) -> Result<()> {
        sqlx::query("INSERT INTO products (id, name, price, description, image_url, category, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
            .bind(p.id).bind(&p.name).bind(p.price.amount()).bind(&p.description).bind(&p.image_url)
            .bind(p.category.as_str()).bind(p.created_at).bind(p.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?
            .map(Product::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
            .fetch_all(&self.pool).await?
            .into_iter().map(Product::try_from).collect()
    }

    async fn update(&self, p: &Product) -> Result<bool> {
        let done = sqlx::query("UPDATE products SET name = $2, price = $3, description = $4, image_url = $5, category = $6, updated_at = $7 WHERE id = $1")
            .bind(p.id).bind(&p.name).bind(p.price.amount()).bind(&p.description).bind(&p.image_url)
            .bind(p.category.as_str()).bind(p.updated_at)
            .execute(&self.pool).await?;
        Ok(done.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() == 1)
    }
}

// =============================================================================
// Carts
// =============================================================================

fn cart_write_error(err: sqlx::Error) -> EcommerceError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => EcommerceError::NotFound(Entity::Product),
        _ => err.into(),
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn find_by_user(&self, user_id: &str) -> Result<Option<Cart>> {
        let Some(cart) = sqlx::query_as::<_, CartRow>("SELECT id, user_id, saved_for_later FROM carts WHERE user_id = $1")
            .bind(user_id).fetch_optional(&self.pool).await?
        else {
            return Ok(None);
        };
        let rows = sqlx::query_as::<_, CartItemRow>(
            "SELECT ci.id AS item_id, ci.quantity, ci.version, \
                    p.id, p.name, p.price, p.description, p.image_url, p.category, p.created_at, p.updated_at \
             FROM cart_items ci JOIN products p ON p.id = ci.product_id \
             WHERE ci.cart_id = $1 ORDER BY ci.id",
        )
        .bind(cart.id)
        .fetch_all(&self.pool)
        .await?;
        let items = rows.into_iter().map(|r| {
            let quantity = Quantity::new(r.quantity).map_err(EcommerceError::storage)?;
            Ok(CartItem::restore(r.item_id, r.product.try_into()?, quantity, Version::from_raw(r.version)))
        }).collect::<Result<Vec<_>>>()?;
        Ok(Some(Cart::restore(cart.id, cart.user_id, cart.saved_for_later, items)))
    }

    async fn save(&self, cart: &Cart) -> Result<Cart> {
        let changes = cart.pending_changes();
        let mut tx = self.pool.begin().await?;

        let cart_id = if changes.create_cart {
            // Insert-or-get: a concurrent creator's row is adopted instead of duplicated.
            sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO carts (id, user_id, saved_for_later) VALUES ($1, $2, FALSE) \
                 ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id RETURNING id",
            )
            .bind(changes.cart_id).bind(&changes.user_id)
            .fetch_one(&mut *tx).await?
        } else {
            changes.cart_id
        };
        if cart_id != changes.cart_id {
            debug!(user_id = %changes.user_id, cart_id = %cart_id, "Adopted concurrently created cart");
        }

        if let Some(flag) = changes.saved_for_later {
            sqlx::query("UPDATE carts SET saved_for_later = $2 WHERE id = $1")
                .bind(cart_id).bind(flag).execute(&mut *tx).await?;
        }

        for write in &changes.items {
            let applied = match write {
                ItemWrite::Insert { item_id, product_id, quantity } => sqlx::query(
                    "INSERT INTO cart_items (id, cart_id, product_id, quantity, version) VALUES ($1, $2, $3, $4, 1) \
                     ON CONFLICT (cart_id, product_id) DO NOTHING",
                )
                .bind(item_id).bind(cart_id).bind(product_id).bind(quantity.value())
                .execute(&mut *tx).await.map_err(cart_write_error)?,
                ItemWrite::Update { item_id, quantity, expected } => sqlx::query(
                    "UPDATE cart_items SET quantity = $2, version = version + 1 WHERE id = $1 AND version = $3",
                )
                .bind(item_id).bind(quantity.value()).bind(expected.value())
                .execute(&mut *tx).await?,
                ItemWrite::Delete { item_id, expected } => sqlx::query(
                    "DELETE FROM cart_items WHERE id = $1 AND version = $2",
                )
                .bind(item_id).bind(expected.value())
                .execute(&mut *tx).await?,
            };
            if applied.rows_affected() != 1 {
                warn!(user_id = %changes.user_id, write = ?write, "Cart item changed since it was read");
                return Err(EcommerceError::ConcurrencyConflict(Entity::CartItem));
            }
        }

        tx.commit().await?;
        self.find_by_user(&changes.user_id).await?.ok_or(EcommerceError::NotFound(Entity::Cart))
    }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO orders (id, user_id, status, order_date) VALUES ($1, $2, $3, $4)")
            .bind(order.id).bind(&order.user_id).bind(&order.status).bind(order.order_date)
            .execute(&mut *tx).await?;
        for d in &order.details {
            sqlx::query("INSERT INTO order_details (id, order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4, $5)")
                .bind(d.id).bind(order.id).bind(d.product_id).bind(d.quantity.value()).bind(d.price.amount())
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT id, user_id, status, order_date FROM orders WHERE id = $1")
            .bind(id).fetch_all(&self.pool).await?;
        Ok(self.assemble(rows).await?.pop())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT id, user_id, status, order_date FROM orders ORDER BY id")
            .fetch_all(&self.pool).await?;
        self.assemble(rows).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT id, user_id, status, order_date FROM orders WHERE user_id = $1 ORDER BY id")
            .bind(user_id).fetch_all(&self.pool).await?;
        self.assemble(rows).await
    }

    async fn update(&self, order: &Order) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let done = sqlx::query("UPDATE orders SET status = $2, order_date = $3 WHERE id = $1")
            .bind(order.id).bind(&order.status).bind(order.order_date)
            .execute(&mut *tx).await?;
        if done.rows_affected() != 1 {
            return Ok(false);
        }
        sqlx::query("DELETE FROM order_details WHERE order_id = $1").bind(order.id).execute(&mut *tx).await?;
        for d in &order.details {
            sqlx::query("INSERT INTO order_details (id, order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4, $5)")
                .bind(d.id).bind(order.id).bind(d.product_id).bind(d.quantity.value()).bind(d.price.amount())
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() == 1)
    }
}

// =============================================================================
// Identity
// =============================================================================

#[async_trait]
impl UserRepository for PgStore {
    async fn insert(&self, u: &User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, username, email, password_hash, roles, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(u.id).bind(&u.username).bind(&u.email).bind(&u.password_hash).bind(&u.roles).bind(u.created_at)
            .execute(&self.pool).await
            .map_err(|e| match EcommerceError::from(e) {
                EcommerceError::Conflict(_) => EcommerceError::Conflict(format!("username '{}' is already taken", u.username)),
                other => other,
            })?;
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, username, email, password_hash, roles, created_at FROM users WHERE username = $1")
            .bind(username).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| User { id: r.id, username: r.username, email: r.email, password_hash: r.password_hash, roles: r.roles, created_at: r.created_at }))
    }

    async fn exists(&self, user_id: &str) -> Result<bool> {
        let Ok(id) = Uuid::parse_str(user_id) else { return Ok(false) };
        let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id).fetch_one(&self.pool).await?;
        Ok(found)
    }
}

#[async_trait]
impl RoleRepository for PgStore {
    async fn list_roles(&self) -> Result<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles ORDER BY name").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|r| Role { id: r.id, name: r.name }).collect())
    }

    async fn insert_role(&self, role: &Role) -> Result<()> {
        sqlx::query("INSERT INTO roles (id, name) VALUES ($1, $2)")
            .bind(role.id).bind(&role.name).execute(&self.pool).await
            .map_err(|e| match EcommerceError::from(e) {
                EcommerceError::Conflict(_) => EcommerceError::Conflict(format!("role '{}' already exists", role.name)),
                other => other,
            })?;
        Ok(())
    }

    async fn delete_role(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM roles WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() == 1)
    }
}
