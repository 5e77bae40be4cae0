//! Cart Aggregate
//!
//! A cart is loaded with every item and each item's current product, mutated in
//! memory, then handed to a [`CartRepository`](crate::repositories::CartRepository)
//! which commits [`Cart::pending_changes`] in one transaction. Writes to items that
//! already exist carry the version observed at load time.

use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{Money, MoneyError, Quantity, QuantityError, Version};

#[derive(Clone, Debug)]
pub struct Cart {
    id: Uuid,
    user_id: String,
    items: Vec<CartItem>,
    saved_for_later: bool,
    persisted: bool,
    flag_changed: bool,
    removed: Vec<(Uuid, Version)>,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug)]
pub struct CartItem {
    id: Uuid,
    product: Product,
    quantity: Quantity,
    version: Option<Version>,
    state: ItemState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ItemState { New, Clean, Modified }

/// Row-level writes needed to persist a cart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemWrite {
    Insert { item_id: Uuid, product_id: Uuid, quantity: Quantity },
    Update { item_id: Uuid, quantity: Quantity, expected: Version },
    Delete { item_id: Uuid, expected: Version },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartChanges {
    pub cart_id: Uuid,
    pub user_id: String,
    pub create_cart: bool,
    pub saved_for_later: Option<bool>,
    pub items: Vec<ItemWrite>,
}

impl CartChanges {
    pub fn is_empty(&self) -> bool { !self.create_cart && self.saved_for_later.is_none() && self.items.is_empty() }
}

impl CartItem {
    /// Rebuilds an item read from storage.
    pub fn restore(id: Uuid, product: Product, quantity: Quantity, version: Version) -> Self {
        Self { id, product, quantity, version: Some(version), state: ItemState::Clean }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn product_id(&self) -> Uuid { self.product.id }
    pub fn product(&self) -> &Product { &self.product }
    pub fn quantity(&self) -> Quantity { self.quantity }
    pub fn version(&self) -> Option<Version> { self.version }
    pub fn line_total(&self) -> Result<Money, MoneyError> { self.product.price.multiply(self.quantity) }

    fn set_quantity(&mut self, quantity: Quantity) {
        self.quantity = quantity;
        if self.state == ItemState::Clean { self.state = ItemState::Modified; }
    }
}

impl Cart {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(), user_id: user_id.into(), items: vec![], saved_for_later: false,
            persisted: false, flag_changed: false, removed: vec![], events: vec![],
        }
    }

    /// Rebuilds a cart read from storage.
    pub fn restore(id: Uuid, user_id: impl Into<String>, saved_for_later: bool, items: Vec<CartItem>) -> Self {
        Self {
            id, user_id: user_id.into(), items, saved_for_later,
            persisted: true, flag_changed: false, removed: vec![], events: vec![],
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn is_saved_for_later(&self) -> bool { self.saved_for_later }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn item(&self, product_id: Uuid) -> Option<&CartItem> { self.items.iter().find(|i| i.product_id() == product_id) }

    /// Sum of quantities across all lines.
    pub fn item_count(&self) -> i64 { self.items.iter().map(|i| i64::from(i.quantity.value())).sum() }

    /// Sum of quantity x current product price.
    pub fn total_price(&self) -> Result<Money, MoneyError> {
        self.items.iter().try_fold(Money::zero(), |acc, i| acc.add(&i.line_total()?))
    }

    /// Adds `quantity` of `product`, accumulating onto an existing line for the same product.
    pub fn add_item(&mut self, product: Product, quantity: Quantity) -> Result<(), QuantityError> {
        let product_id = product.id;
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id() == product_id) {
            let merged = existing.quantity.checked_add(quantity)?;
            existing.product = product;
            existing.set_quantity(merged);
        } else {
            self.items.push(CartItem { id: Uuid::now_v7(), product, quantity, version: None, state: ItemState::New });
        }
        self.raise_event(DomainEvent::Cart(CartEvent::ItemAdded {
            cart_id: self.id, user_id: self.user_id.clone(), product_id, quantity: quantity.value(),
        }));
        Ok(())
    }

    /// Sets the quantity of an existing line. Returns `false` when the product is not in the cart.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: Quantity) -> bool {
        match self.items.iter_mut().find(|i| i.product_id() == product_id) {
            Some(item) => { item.set_quantity(quantity); true }
            None => false,
        }
    }

    /// Removes the line for `product_id`. Returns `false` when there was none.
    pub fn remove_item(&mut self, product_id: Uuid) -> bool {
        let Some(pos) = self.items.iter().position(|i| i.product_id() == product_id) else { return false };
        let item = self.items.remove(pos);
        self.forget(item);
        self.raise_event(DomainEvent::Cart(CartEvent::ItemRemoved { cart_id: self.id, product_id }));
        true
    }

    pub fn clear(&mut self) {
        for item in std::mem::take(&mut self.items) { self.forget(item); }
        self.raise_event(DomainEvent::Cart(CartEvent::Cleared { cart_id: self.id }));
    }

    pub fn save_for_later(&mut self) {
        if !self.saved_for_later { self.saved_for_later = true; self.flag_changed = !self.flag_changed; }
        self.raise_event(DomainEvent::Cart(CartEvent::SavedForLater { cart_id: self.id }));
    }

    /// Clears the saved flag. Returns `false` if the cart was not saved.
    pub fn restore_saved(&mut self) -> bool {
        if !self.saved_for_later { return false; }
        self.saved_for_later = false;
        self.flag_changed = !self.flag_changed;
        self.raise_event(DomainEvent::Cart(CartEvent::Restored { cart_id: self.id }));
        true
    }

    pub fn pending_changes(&self) -> CartChanges {
        let mut items: Vec<ItemWrite> = self.removed.iter()
            .map(|(item_id, expected)| ItemWrite::Delete { item_id: *item_id, expected: *expected })
            .collect();
        for item in &self.items {
            match (item.state, item.version) {
                (ItemState::New, _) => items.push(ItemWrite::Insert { item_id: item.id, product_id: item.product_id(), quantity: item.quantity }),
                (ItemState::Modified, Some(expected)) => items.push(ItemWrite::Update { item_id: item.id, quantity: item.quantity, expected }),
                _ => {}
            }
        }
        CartChanges {
            cart_id: self.id,
            user_id: self.user_id.clone(),
            create_cart: !self.persisted,
            saved_for_later: self.flag_changed.then_some(self.saved_for_later),
            items,
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }

    fn forget(&mut self, item: CartItem) {
        if let (ItemState::Clean | ItemState::Modified, Some(v)) = (item.state, item.version) {
            self.removed.push((item.id, v));
        }
    }
}
