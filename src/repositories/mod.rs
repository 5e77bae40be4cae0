//! Storage ports and their adapters.
//!
//! Every trait has a PostgreSQL implementation ([`postgres::PgStore`]) and an
//! in-memory one ([`memory::MemoryStore`]) with the same commit and version rules.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, Product, Role, User};
use crate::Result;

pub mod images;
pub mod memory;
pub mod postgres;

pub use images::{ImageStore, LocalImageStore};
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, product: &Product) -> Result<()>;
    async fn find(&self, id: Uuid) -> Result<Option<Product>>;
    async fn list(&self) -> Result<Vec<Product>>;
    /// Returns `false` when no product has this id.
    async fn update(&self, product: &Product) -> Result<bool>;
    /// Hard delete; cart lines referencing the product go with it.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Loads the user's cart with every item and its current product.
    async fn find_by_user(&self, user_id: &str) -> Result<Option<Cart>>;

    /// Commits `cart.pending_changes()` in one transaction and returns the stored cart.
    ///
    /// A new cart is inserted-or-adopted by user id. Updates and deletes of existing
    /// items only apply when the stored version still matches; otherwise nothing is
    /// committed and `ConcurrencyConflict(CartItem)` is returned.
    async fn save(&self, cart: &Cart) -> Result<Cart>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<()>;
    async fn find(&self, id: Uuid) -> Result<Option<Order>>;
    async fn list(&self) -> Result<Vec<Order>>;
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Order>>;
    /// Overwrites status, date and detail lines. Returns `false` when the order is gone.
    async fn update(&self, order: &Order) -> Result<bool>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn insert(&self, user: &User) -> Result<()>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn exists(&self, user_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn list_roles(&self) -> Result<Vec<Role>>;
    /// Fails with `Conflict` when the name is taken.
    async fn insert_role(&self, role: &Role) -> Result<()>;
    async fn delete_role(&self, id: Uuid) -> Result<bool>;
}
