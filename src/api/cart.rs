//! Cart endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::AppState;
use crate::domain::aggregates::Cart;
use crate::{EcommerceError, Entity, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/cart/:user_id", get(get_cart))
        .route("/api/cart/:user_id/items", post(add_item))
        .route("/api/cart/:user_id/items/:product_id", put(update_quantity).delete(remove_item))
        .route("/api/cart/:user_id/clear", delete(clear_cart))
        .route("/api/cart/:user_id/itemcount", get(item_count))
        .route("/api/cart/:user_id/totalprice", get(total_price))
        .route("/api/cart/:user_id/save", post(save_for_later))
        .route("/api/cart/:user_id/restore", post(restore_saved))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDto {
    pub cart_id: Uuid,
    pub user_id: String,
    pub saved_for_later: bool,
    pub cart_items: Vec<CartItemDto>,
    pub item_count: i64,
    pub total_price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDto {
    pub cart_item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl TryFrom<&Cart> for CartDto {
    type Error = EcommerceError;

    fn try_from(cart: &Cart) -> Result<Self> {
        Ok(Self {
            cart_id: cart.id(),
            user_id: cart.user_id().to_string(),
            saved_for_later: cart.is_saved_for_later(),
            cart_items: cart.items().iter().map(|item| CartItemDto {
                cart_item_id: item.id(),
                product_id: item.product_id(),
                product_name: item.product().name.clone(),
                unit_price: item.product().price.amount(),
                quantity: item.quantity().value(),
            }).collect(),
            item_count: cart.item_count(),
            total_price: cart.total_price()?.amount(),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be greater than zero."))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuantityRequest {
    #[validate(range(min = 1, message = "Quantity must be greater than zero."))]
    pub quantity: i32,
}

async fn get_cart(State(s): State<AppState>, Path(user_id): Path<String>) -> Result<Json<CartDto>> {
    info!(user_id, "Received request to get cart");
    let cart = s.cart.get_cart(&user_id).await?.ok_or(EcommerceError::NotFound(Entity::Cart))?;
    Ok(Json(CartDto::try_from(&cart)?))
}

async fn add_item(State(s): State<AppState>, Path(user_id): Path<String>, Json(req): Json<AddItemRequest>) -> Result<Json<CartDto>> {
    info!(user_id, product_id = %req.product_id, "Received request to add item to cart");
    req.validate()?;
    let cart = s.cart.add_item(&user_id, req.product_id, req.quantity).await?;
    Ok(Json(CartDto::try_from(&cart)?))
}

async fn update_quantity(
    State(s): State<AppState>,
    Path((user_id, product_id)): Path<(String, Uuid)>,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<serde_json::Value>> {
    req.validate()?;
    if !s.cart.update_item_quantity(&user_id, product_id, req.quantity).await? {
        warn!(user_id, product_id = %product_id, "Cart item not found");
        return Err(EcommerceError::NotFound(Entity::CartItem));
    }
    Ok(Json(json!({ "updated": true })))
}

async fn remove_item(State(s): State<AppState>, Path((user_id, product_id)): Path<(String, Uuid)>) -> Result<Json<CartDto>> {
    info!(user_id, product_id = %product_id, "Received request to remove item from cart");
    let cart = s.cart.remove_item(&user_id, product_id).await?.ok_or(EcommerceError::NotFound(Entity::Cart))?;
    Ok(Json(CartDto::try_from(&cart)?))
}

async fn clear_cart(State(s): State<AppState>, Path(user_id): Path<String>) -> Result<Json<CartDto>> {
    info!(user_id, "Received request to clear cart");
    let cart = s.cart.clear_cart(&user_id).await?.ok_or(EcommerceError::NotFound(Entity::Cart))?;
    Ok(Json(CartDto::try_from(&cart)?))
}

async fn item_count(State(s): State<AppState>, Path(user_id): Path<String>) -> Result<Json<serde_json::Value>> {
    Ok(Json(json!({ "itemCount": s.cart.item_count(&user_id).await? })))
}

async fn total_price(State(s): State<AppState>, Path(user_id): Path<String>) -> Result<Json<serde_json::Value>> {
    Ok(Json(json!({ "totalPrice": s.cart.total_price(&user_id).await?.amount() })))
}

async fn save_for_later(State(s): State<AppState>, Path(user_id): Path<String>) -> Result<StatusCode> {
    info!(user_id, "Received request to save cart");
    if !s.cart.save_for_later(&user_id).await? {
        return Err(EcommerceError::NotFound(Entity::Cart));
    }
    Ok(StatusCode::OK)
}

async fn restore_saved(State(s): State<AppState>, Path(user_id): Path<String>) -> Result<Json<CartDto>> {
    info!(user_id, "Received request to restore saved cart");
    let cart = s.cart.restore_saved_cart(&user_id).await?.ok_or(EcommerceError::NotFound(Entity::Cart))?;
    Ok(Json(CartDto::try_from(&cart)?))
}
