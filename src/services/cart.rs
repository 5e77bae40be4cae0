//! Cart engine.
//!
//! Every operation is a single read-modify-write against the cart store. No
//! in-process locks are taken; stale writes surface as
//! [`EcommerceError::ConcurrencyConflict`] and retrying is left to the caller.

use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::aggregates::Cart;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{Money, Quantity};
use crate::repositories::{CartRepository, ProductRepository};
use crate::services::events::EventPublisher;
use crate::{EcommerceError, Entity, Result};

#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
    events: Arc<dyn EventPublisher>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn ProductRepository>, events: Arc<dyn EventPublisher>) -> Self {
        Self { carts, products, events }
    }

    /// The user's cart with resolved products, or `None` if they have none yet.
    pub async fn get_cart(&self, user_id: &str) -> Result<Option<Cart>> {
        info!(user_id, "Getting cart");
        self.carts.find_by_user(user_id).await
    }

    /// Adds `quantity` of a product, creating the cart on first use and merging onto an existing line.
    pub async fn add_item(&self, user_id: &str, product_id: Uuid, quantity: i32) -> Result<Cart> {
        info!(user_id, %product_id, quantity, "Adding item to cart");
        let quantity = Quantity::new(quantity)?;
        let Some(product) = self.products.find(product_id).await? else {
            warn!(%product_id, "Product not found");
            return Err(EcommerceError::NotFound(Entity::Product));
        };

        let mut cart = match self.carts.find_by_user(user_id).await? {
            Some(cart) => cart,
            None => Cart::new(user_id),
        };
        cart.add_item(product, quantity)?;
        let saved = self.commit(&mut cart).await.inspect_err(|e| {
            error!(user_id, %product_id, error = %e, "Failed to add item to cart");
        })?;
        info!(user_id, %product_id, "Item added to cart");
        Ok(saved)
    }

    /// Removes a product's line. Absent lines are a no-op; `None` means the user has no cart.
    pub async fn remove_item(&self, user_id: &str, product_id: Uuid) -> Result<Option<Cart>> {
        info!(user_id, %product_id, "Removing item from cart");
        let Some(mut cart) = self.carts.find_by_user(user_id).await? else {
            warn!(user_id, "Cart not found");
            return Ok(None);
        };
        if !cart.remove_item(product_id) {
            return Ok(Some(cart));
        }
        self.commit(&mut cart).await.map(Some)
    }

    pub async fn clear_cart(&self, user_id: &str) -> Result<Option<Cart>> {
        info!(user_id, "Clearing cart");
        let Some(mut cart) = self.carts.find_by_user(user_id).await? else {
            warn!(user_id, "Cart not found");
            return Ok(None);
        };
        cart.clear();
        self.commit(&mut cart).await.map(Some)
    }

    /// Overwrites a line's quantity. Returns `false` if the cart or the line does not exist.
    /// Non-positive quantities are rejected rather than treated as a removal.
    pub async fn update_item_quantity(&self, user_id: &str, product_id: Uuid, quantity: i32) -> Result<bool> {
        info!(user_id, %product_id, quantity, "Updating item quantity");
        let quantity = Quantity::new(quantity)?;
        let Some(mut cart) = self.carts.find_by_user(user_id).await? else { return Ok(false) };
        if !cart.update_quantity(product_id, quantity) {
            return Ok(false);
        }
        self.commit(&mut cart).await?;
        Ok(true)
    }

    pub async fn item_count(&self, user_id: &str) -> Result<i64> {
        info!(user_id, "Getting cart item count");
        Ok(self.carts.find_by_user(user_id).await?.map(|c| c.item_count()).unwrap_or(0))
    }

    /// Priced at the catalog's current prices.
    pub async fn total_price(&self, user_id: &str) -> Result<Money> {
        info!(user_id, "Getting cart total price");
        Ok(self.carts.find_by_user(user_id).await?.map(|c| c.total_price()).transpose()?.unwrap_or_default())
    }

    pub async fn save_for_later(&self, user_id: &str) -> Result<bool> {
        info!(user_id, "Saving cart for later");
        let Some(mut cart) = self.carts.find_by_user(user_id).await? else { return Ok(false) };
        cart.save_for_later();
        self.commit(&mut cart).await?;
        Ok(true)
    }

    /// Clears the saved flag. `None` if there is no cart or it was not saved.
    pub async fn restore_saved_cart(&self, user_id: &str) -> Result<Option<Cart>> {
        info!(user_id, "Restoring saved cart");
        let Some(mut cart) = self.carts.find_by_user(user_id).await? else { return Ok(None) };
        if !cart.restore_saved() {
            warn!(user_id, "Cart was not saved for later");
            return Ok(None);
        }
        self.commit(&mut cart).await.map(Some)
    }

    async fn commit(&self, cart: &mut Cart) -> Result<Cart> {
        let events = cart.take_events();
        let saved = self.carts.save(cart).await.inspect_err(|e| {
            if e.is_retryable() { warn!(user_id = cart.user_id(), "Cart changed concurrently"); }
        })?;
        // A first save may adopt a cart created concurrently under another id.
        let events = events.into_iter().map(|event| match event {
            DomainEvent::Cart(e) => DomainEvent::Cart(e.with_cart_id(saved.id())),
            other => other,
        }).collect();
        self.events.publish(events).await;
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Product, ProductCategory, ProductDraft};
    use crate::domain::events::CartEvent;
    use crate::repositories::MemoryStore;
    use crate::services::events::testing::RecordingPublisher;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Fixture {
        store: Arc<MemoryStore>,
        events: Arc<RecordingPublisher>,
        service: CartService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(RecordingPublisher::default());
        let service = CartService::new(store.clone(), store.clone(), events.clone());
        Fixture { store, events, service }
    }

    async fn product(store: &MemoryStore, cents: i64) -> Product {
        let p = Product::create(ProductDraft {
            name: "Kettle".into(), price: Money::new(Decimal::new(cents, 2)).unwrap(),
            description: String::new(), image_url: String::new(), category: ProductCategory::HomeAndKitchen,
        }).unwrap();
        ProductRepository::insert(store, &p).await.unwrap();
        p
    }

    #[tokio::test]
    async fn test_add_merge_remove_scenario() {
        let f = fixture();
        let p = product(&f.store, 1000).await;

        let cart = f.service.add_item("u1", p.id, 2).await.unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(f.service.total_price("u1").await.unwrap().amount(), Decimal::new(2000, 2));

        let cart = f.service.add_item("u1", p.id, 3).await.unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity().value(), 5);
        assert_eq!(f.service.total_price("u1").await.unwrap().amount(), Decimal::new(5000, 2));

        let cart = f.service.remove_item("u1", p.id).await.unwrap().unwrap();
        assert!(cart.is_empty());
        assert_eq!(f.service.total_price("u1").await.unwrap().to_string(), "0.00");
        assert_eq!(f.events.subjects(), vec!["cart.item_added", "cart.item_added", "cart.item_removed"]);
    }

    #[tokio::test]
    async fn test_add_item_rejects_unknown_product_and_bad_quantity() {
        let f = fixture();
        let p = product(&f.store, 100).await;
        assert!(matches!(f.service.add_item("u1", Uuid::now_v7(), 1).await, Err(EcommerceError::NotFound(Entity::Product))));
        assert!(matches!(f.service.add_item("u1", p.id, 0).await, Err(EcommerceError::InvalidArgument(_))));
        assert!(f.service.get_cart("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_cart_outcomes() {
        let f = fixture();
        assert!(f.service.get_cart("nobody").await.unwrap().is_none());
        assert!(f.service.remove_item("nobody", Uuid::now_v7()).await.unwrap().is_none());
        assert!(f.service.clear_cart("nobody").await.unwrap().is_none());
        assert!(!f.service.update_item_quantity("nobody", Uuid::now_v7(), 1).await.unwrap());
        assert!(!f.service.save_for_later("nobody").await.unwrap());
        assert!(f.service.restore_saved_cart("nobody").await.unwrap().is_none());
        assert_eq!(f.service.item_count("nobody").await.unwrap(), 0);
        assert_eq!(f.service.total_price("nobody").await.unwrap().amount(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_remove_absent_item_is_noop() {
        let f = fixture();
        let p = product(&f.store, 100).await;
        f.service.add_item("u1", p.id, 1).await.unwrap();
        let cart = f.service.remove_item("u1", Uuid::now_v7()).await.unwrap().unwrap();
        assert_eq!(cart.item_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_then_count_is_zero() {
        let f = fixture();
        let a = product(&f.store, 100).await;
        let b = product(&f.store, 250).await;
        f.service.add_item("u1", a.id, 1).await.unwrap();
        f.service.add_item("u1", b.id, 4).await.unwrap();
        assert_eq!(f.service.item_count("u1").await.unwrap(), 5);
        let cart = f.service.clear_cart("u1").await.unwrap().unwrap();
        assert!(cart.is_empty());
        assert_eq!(f.service.item_count("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_total_follows_live_catalog_price() {
        let f = fixture();
        let mut p = product(&f.store, 1000).await;
        f.service.add_item("u1", p.id, 3).await.unwrap();
        p.price = Money::new(Decimal::new(1250, 2)).unwrap();
        assert!(ProductRepository::update(f.store.as_ref(), &p).await.unwrap());
        assert_eq!(f.service.total_price("u1").await.unwrap().amount(), Decimal::new(3750, 2));
    }

    #[tokio::test]
    async fn test_total_of_top_priced_lines() {
        let f = fixture();
        let mut p = product(&f.store, 100).await;
        p.price = Money::new(Money::MAX).unwrap();
        assert!(ProductRepository::update(f.store.as_ref(), &p).await.unwrap());
        f.service.add_item("u1", p.id, 1).await.unwrap();
        f.service.add_item("u1", p.id, 1000).await.unwrap();
        assert_eq!(f.service.total_price("u1").await.unwrap().amount(), Money::MAX * Decimal::from(1001));
    }

    #[tokio::test]
    async fn test_update_quantity_sets_and_rejects_non_positive() {
        let f = fixture();
        let p = product(&f.store, 100).await;
        f.service.add_item("u1", p.id, 5).await.unwrap();
        assert!(f.service.update_item_quantity("u1", p.id, 2).await.unwrap());
        assert_eq!(f.service.item_count("u1").await.unwrap(), 2);
        assert!(!f.service.update_item_quantity("u1", Uuid::now_v7(), 2).await.unwrap());
        assert!(matches!(f.service.update_item_quantity("u1", p.id, 0).await, Err(EcommerceError::InvalidArgument(_))));
        assert!(matches!(f.service.update_item_quantity("u1", p.id, -4).await, Err(EcommerceError::InvalidArgument(_))));
        assert_eq!(f.service.item_count("u1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_save_then_restore_round_trip() {
        let f = fixture();
        let p = product(&f.store, 333).await;
        f.service.add_item("u1", p.id, 3).await.unwrap();
        let before = f.service.get_cart("u1").await.unwrap().unwrap();
        assert!(f.service.restore_saved_cart("u1").await.unwrap().is_none());

        assert!(f.service.save_for_later("u1").await.unwrap());
        let saved = f.service.get_cart("u1").await.unwrap().unwrap();
        assert!(saved.is_saved_for_later());

        let restored = f.service.restore_saved_cart("u1").await.unwrap().unwrap();
        assert!(!restored.is_saved_for_later());
        assert_eq!(restored.item_count(), before.item_count());
        assert_eq!(restored.total_price().unwrap(), before.total_price().unwrap());
        assert_eq!(restored.items()[0].id(), before.items()[0].id());
    }

    /// Lets another writer commit between the engine's read and its write, once.
    struct InterleavedCarts {
        inner: Arc<MemoryStore>,
        product: Product,
        fired: AtomicBool,
    }

    #[async_trait]
    impl CartRepository for InterleavedCarts {
        async fn find_by_user(&self, user_id: &str) -> Result<Option<Cart>> {
            let snapshot = self.inner.find_by_user(user_id).await?;
            if !self.fired.swap(true, Ordering::SeqCst) {
                let mut rival = self.inner.find_by_user(user_id).await?.expect("cart exists");
                rival.add_item(self.product.clone(), Quantity::new(1).unwrap()).unwrap();
                self.inner.save(&rival).await?;
            }
            Ok(snapshot)
        }

        async fn save(&self, cart: &Cart) -> Result<Cart> {
            self.inner.save(cart).await
        }
    }

    /// Reports no cart on the first lookup after another writer has created one.
    struct LateCartCreation {
        inner: Arc<MemoryStore>,
        product: Product,
        fired: AtomicBool,
    }

    #[async_trait]
    impl CartRepository for LateCartCreation {
        async fn find_by_user(&self, user_id: &str) -> Result<Option<Cart>> {
            if !self.fired.swap(true, Ordering::SeqCst) {
                let mut rival = Cart::new(user_id);
                rival.add_item(self.product.clone(), Quantity::new(1).unwrap()).unwrap();
                self.inner.save(&rival).await?;
                return Ok(None);
            }
            self.inner.find_by_user(user_id).await
        }

        async fn save(&self, cart: &Cart) -> Result<Cart> {
            self.inner.save(cart).await
        }
    }

    #[tokio::test]
    async fn test_events_name_the_adopted_cart() {
        let f = fixture();
        let rival_product = product(&f.store, 100).await;
        let p = product(&f.store, 200).await;
        let racing = CartService::new(
            Arc::new(LateCartCreation { inner: f.store.clone(), product: rival_product, fired: AtomicBool::new(false) }),
            f.store.clone(),
            f.events.clone(),
        );

        let cart = racing.add_item("u1", p.id, 2).await.unwrap();
        assert_eq!(cart.items().len(), 2);
        let stored_id = f.store.find_by_user("u1").await.unwrap().unwrap().id();
        assert_eq!(cart.id(), stored_id);

        let events = f.events.events.lock().unwrap().clone();
        assert!(matches!(
            events.as_slice(),
            [DomainEvent::Cart(CartEvent::ItemAdded { cart_id, product_id, .. })] if *cart_id == stored_id && *product_id == p.id
        ));
    }

    #[tokio::test]
    async fn test_concurrent_add_conflicts_then_retry_succeeds() {
        let f = fixture();
        let p = product(&f.store, 1000).await;
        f.service.add_item("u1", p.id, 1).await.unwrap();
        let version_before = f.store.find_by_user("u1").await.unwrap().unwrap().items()[0].version().unwrap();

        let racing = CartService::new(
            Arc::new(InterleavedCarts { inner: f.store.clone(), product: p.clone(), fired: AtomicBool::new(false) }),
            f.store.clone(),
            f.events.clone(),
        );
        let err = racing.add_item("u1", p.id, 2).await.unwrap_err();
        assert!(matches!(err, EcommerceError::ConcurrencyConflict(Entity::CartItem)));
        assert!(err.is_retryable());

        let stored = f.store.find_by_user("u1").await.unwrap().unwrap();
        assert_eq!(stored.item_count(), 2);
        assert!(stored.items()[0].version().unwrap() > version_before);

        let cart = racing.add_item("u1", p.id, 2).await.unwrap();
        assert_eq!(cart.item_count(), 4);
    }
}
