//! In-memory storage with the same commit rules as the PostgreSQL adapter.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem, ItemWrite, Order, Product, Role, User};
use crate::domain::value_objects::{Quantity, Version};
use crate::repositories::{CartRepository, OrderRepository, ProductRepository, RoleRepository, UserRepository};
use crate::{EcommerceError, Entity, Result};

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, CartRow>,
    cart_items: HashMap<Uuid, CartItemRow>,
    orders: HashMap<Uuid, Order>,
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Role>,
}

#[derive(Clone)]
struct CartRow { id: Uuid, user_id: String, saved_for_later: bool }

#[derive(Clone)]
struct CartItemRow { id: Uuid, cart_id: Uuid, product_id: Uuid, quantity: Quantity, version: Version }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl State {
    fn load_cart(&self, user_id: &str) -> Result<Option<Cart>> {
        let Some(row) = self.carts.values().find(|c| c.user_id == user_id) else { return Ok(None) };
        let mut rows: Vec<&CartItemRow> = self.cart_items.values().filter(|i| i.cart_id == row.id).collect();
        rows.sort_by_key(|i| i.id);
        let items = rows.into_iter().map(|i| {
            let product = self.products.get(&i.product_id).cloned()
                .ok_or_else(|| EcommerceError::storage(format!("cart item {} references a missing product", i.id)))?;
            Ok(CartItem::restore(i.id, product, i.quantity, i.version))
        }).collect::<Result<Vec<_>>>()?;
        Ok(Some(Cart::restore(row.id, row.user_id.clone(), row.saved_for_later, items)))
    }

    fn check_item(&self, item_id: Uuid, expected: Version) -> Result<()> {
        match self.cart_items.get(&item_id) {
            Some(row) if row.version == expected => Ok(()),
            _ => Err(EcommerceError::ConcurrencyConflict(Entity::CartItem)),
        }
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn insert(&self, product: &Product) -> Result<()> {
        let mut s = self.state.lock().await;
        if s.products.contains_key(&product.id) { return Err(EcommerceError::Conflict("product id already exists".into())); }
        s.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self.state.lock().await.products.values().cloned().collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn update(&self, product: &Product) -> Result<bool> {
        let mut s = self.state.lock().await;
        match s.products.get_mut(&product.id) {
            Some(existing) => { *existing = product.clone(); Ok(true) }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut s = self.state.lock().await;
        if s.products.remove(&id).is_none() { return Ok(false); }
        s.cart_items.retain(|_, i| i.product_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn find_by_user(&self, user_id: &str) -> Result<Option<Cart>> {
        self.state.lock().await.load_cart(user_id)
    }

    async fn save(&self, cart: &Cart) -> Result<Cart> {
        let changes = cart.pending_changes();
        let mut s = self.state.lock().await;

        let existing = s.carts.values().find(|c| c.user_id == changes.user_id).map(|c| c.id);
        let cart_id = match existing {
            Some(id) => id,
            None if changes.create_cart => changes.cart_id,
            None => return Err(EcommerceError::NotFound(Entity::Cart)),
        };

        // Validate every write before applying any of them.
        for write in &changes.items {
            match write {
                ItemWrite::Insert { product_id, .. } => {
                    if !s.products.contains_key(product_id) { return Err(EcommerceError::NotFound(Entity::Product)); }
                    if s.cart_items.values().any(|i| i.cart_id == cart_id && i.product_id == *product_id) {
                        return Err(EcommerceError::ConcurrencyConflict(Entity::CartItem));
                    }
                }
                ItemWrite::Update { item_id, expected, .. } | ItemWrite::Delete { item_id, expected } => {
                    s.check_item(*item_id, *expected)?;
                }
            }
        }

        if existing.is_none() {
            s.carts.insert(cart_id, CartRow { id: cart_id, user_id: changes.user_id.clone(), saved_for_later: false });
        }
        if let (Some(flag), Some(row)) = (changes.saved_for_later, s.carts.get_mut(&cart_id)) {
            row.saved_for_later = flag;
        }
        for write in changes.items {
            match write {
                ItemWrite::Insert { item_id, product_id, quantity } => {
                    s.cart_items.insert(item_id, CartItemRow { id: item_id, cart_id, product_id, quantity, version: Version::initial() });
                }
                ItemWrite::Update { item_id, quantity, .. } => {
                    if let Some(row) = s.cart_items.get_mut(&item_id) {
                        row.quantity = quantity;
                        row.version = row.version.next();
                    }
                }
                ItemWrite::Delete { item_id, .. } => { s.cart_items.remove(&item_id); }
            }
        }

        s.load_cart(&changes.user_id)?.ok_or(EcommerceError::NotFound(Entity::Cart))
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut s = self.state.lock().await;
        if s.orders.contains_key(&order.id) { return Err(EcommerceError::Conflict("order id already exists".into())); }
        s.orders.insert(order.id, stored(order));
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.state.lock().await.orders.values().cloned().collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.state.lock().await.orders.values().filter(|o| o.user_id == user_id).cloned().collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn update(&self, order: &Order) -> Result<bool> {
        let mut s = self.state.lock().await;
        match s.orders.get_mut(&order.id) {
            Some(existing) => { *existing = stored(order); Ok(true) }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.lock().await.orders.remove(&id).is_some())
    }
}

fn stored(order: &Order) -> Order {
    Order::restore(order.id, order.user_id.clone(), order.status.clone(), order.order_date, order.details.clone())
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut s = self.state.lock().await;
        if s.users.values().any(|u| u.username == user.username) {
            return Err(EcommerceError::Conflict(format!("username '{}' is already taken", user.username)));
        }
        s.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.values().find(|u| u.username == username).cloned())
    }

    async fn exists(&self, user_id: &str) -> Result<bool> {
        let Ok(id) = Uuid::parse_str(user_id) else { return Ok(false) };
        Ok(self.state.lock().await.users.contains_key(&id))
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn list_roles(&self) -> Result<Vec<Role>> {
        let mut roles: Vec<Role> = self.state.lock().await.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn insert_role(&self, role: &Role) -> Result<()> {
        let mut s = self.state.lock().await;
        if s.roles.values().any(|r| r.name == role.name) {
            return Err(EcommerceError::Conflict(format!("role '{}' already exists", role.name)));
        }
        s.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn delete_role(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.lock().await.roles.remove(&id).is_some())
    }
}
