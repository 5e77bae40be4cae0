//! Order endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{AppState, AuthUser};
use crate::domain::aggregates::{LineDraft, Order, OrderDraft};
use crate::{EcommerceError, Entity, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/mine", get(my_orders))
        .route("/api/orders/user/:user_id", get(orders_for_user))
        .route("/api/orders/:id", get(get_order).put(update_order).delete(delete_order))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub order_details: Vec<OrderDetailRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

impl OrderRequest {
    fn draft(self) -> OrderDraft {
        OrderDraft {
            status: self.status,
            order_date: self.order_date.unwrap_or_else(Utc::now),
            details: self.order_details.into_iter()
                .map(|d| LineDraft { product_id: d.product_id, quantity: d.quantity, price: d.price })
                .collect(),
        }
    }
}

async fn create_order(State(s): State<AppState>, Json(req): Json<OrderRequest>) -> Result<(StatusCode, Json<Order>)> {
    req.validate()?;
    let user_id = req.user_id.clone();
    let order = s.orders.create_order(&user_id, req.draft()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    s.orders.get_order(id).await?.map(Json).ok_or(EcommerceError::NotFound(Entity::Order))
}

async fn list_orders(State(s): State<AppState>) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.orders.list_orders().await?))
}

/// The owner recorded on an order cannot be changed.
async fn update_order(State(s): State<AppState>, Path(id): Path<Uuid>, Json(req): Json<OrderRequest>) -> Result<Json<Order>> {
    Ok(Json(s.orders.update_order(id, req.draft()).await?))
}

async fn delete_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.orders.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn my_orders(State(s): State<AppState>, AuthUser(claims): AuthUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.orders.orders_for_user(&claims.sub).await?))
}

async fn orders_for_user(State(s): State<AppState>, Path(user_id): Path<String>) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.orders.orders_for_user(&user_id).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{app, send};
    use crate::repositories::MemoryStore;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_order_lifecycle_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(Arc::new(MemoryStore::new()), dir.path());

        let (status, _) = send(&app, "POST", "/api/auth/register", Some(json!({ "username": "ola", "email": "ola@example.com", "password": "secret123" })), None).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, login) = send(&app, "POST", "/api/auth/login", Some(json!({ "username": "ola", "password": "secret123" })), None).await;
        let token = login["token"].as_str().unwrap().to_string();
        let (_, me) = send(&app, "GET", "/api/orders/mine", None, Some(&token)).await;
        assert_eq!(me, json!([]));

        let (status, _) = send(&app, "GET", "/api/orders/mine", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let user_id = login["userId"].as_str().unwrap().to_string();

        let line = json!({ "productId": uuid::Uuid::now_v7(), "quantity": 2, "price": "12.50" });
        let (status, _) = send(&app, "POST", "/api/orders", Some(json!({ "userId": "ghost", "orderDetails": [line] })), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, created) = send(&app, "POST", "/api/orders", Some(json!({ "userId": user_id, "orderDetails": [line] })), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "Pending");
        let id = created["id"].as_str().unwrap().to_string();

        let (_, mine) = send(&app, "GET", "/api/orders/mine", None, Some(&token)).await;
        assert_eq!(mine.as_array().unwrap().len(), 1);
        let (_, by_user) = send(&app, "GET", &format!("/api/orders/user/{user_id}"), None, None).await;
        assert_eq!(by_user.as_array().unwrap().len(), 1);

        let (status, updated) = send(&app, "PUT", &format!("/api/orders/{id}"), Some(json!({ "status": "Shipped", "orderDetails": [line] })), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "Shipped");

        let (status, _) = send(&app, "DELETE", &format!("/api/orders/{id}"), None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "DELETE", &format!("/api/orders/{id}"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
