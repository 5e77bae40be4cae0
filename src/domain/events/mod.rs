//! Domain events
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "aggregate", content = "event")]
pub enum DomainEvent {
    Product(ProductEvent),
    Cart(CartEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ProductEvent {
    Created { product_id: Uuid },
    Updated { product_id: Uuid },
    Deleted { product_id: Uuid },
    ImageUploaded { product_id: Uuid, locator: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CartEvent {
    ItemAdded { cart_id: Uuid, user_id: String, product_id: Uuid, quantity: i32 },
    ItemRemoved { cart_id: Uuid, product_id: Uuid },
    Cleared { cart_id: Uuid },
    SavedForLater { cart_id: Uuid },
    Restored { cart_id: Uuid },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum OrderEvent {
    Created { order_id: Uuid, user_id: String },
    Updated { order_id: Uuid, status: String },
    Deleted { order_id: Uuid },
}

impl CartEvent {
    /// Points the event at `id`, the cart row the write actually landed in.
    pub fn with_cart_id(mut self, id: Uuid) -> Self {
        match &mut self {
            Self::ItemAdded { cart_id, .. }
            | Self::ItemRemoved { cart_id, .. }
            | Self::Cleared { cart_id }
            | Self::SavedForLater { cart_id }
            | Self::Restored { cart_id } => *cart_id = id,
        }
        self
    }
}

impl DomainEvent {
    /// NATS subject suffix, e.g. `cart.item_added`.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::Created { .. }) => "product.created",
            Self::Product(ProductEvent::Updated { .. }) => "product.updated",
            Self::Product(ProductEvent::Deleted { .. }) => "product.deleted",
            Self::Product(ProductEvent::ImageUploaded { .. }) => "product.image_uploaded",
            Self::Cart(CartEvent::ItemAdded { .. }) => "cart.item_added",
            Self::Cart(CartEvent::ItemRemoved { .. }) => "cart.item_removed",
            Self::Cart(CartEvent::Cleared { .. }) => "cart.cleared",
            Self::Cart(CartEvent::SavedForLater { .. }) => "cart.saved_for_later",
            Self::Cart(CartEvent::Restored { .. }) => "cart.restored",
            Self::Order(OrderEvent::Created { .. }) => "order.created",
            Self::Order(OrderEvent::Updated { .. }) => "order.updated",
            Self::Order(OrderEvent::Deleted { .. }) => "order.deleted",
        }
    }
}
