//! Product catalog endpoints.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::AppState;
use crate::domain::aggregates::{Product, ProductCategory, ProductDraft};
use crate::domain::value_objects::Money;
use crate::{EcommerceError, Entity, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/upload-image", post(upload_image))
        .route("/api/products/:id", get(get_product).put(update_product).delete(delete_product))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub image_url: String,
    #[serde(default)]
    pub category: ProductCategory,
}

impl ProductRequest {
    fn into_draft(self) -> Result<ProductDraft> {
        self.validate()?;
        Ok(ProductDraft {
            name: self.name,
            price: Money::new(self.price)?,
            description: self.description,
            image_url: self.image_url,
            category: self.category,
        })
    }
}

async fn create_product(State(s): State<AppState>, Json(req): Json<ProductRequest>) -> Result<(StatusCode, Json<Product>)> {
    let product = s.catalog.create_product(req.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    s.catalog.get_product(id).await?.map(Json).ok_or(EcommerceError::NotFound(Entity::Product))
}

async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.list_products().await?))
}

async fn update_product(State(s): State<AppState>, Path(id): Path<Uuid>, Json(req): Json<ProductRequest>) -> Result<Json<Product>> {
    Ok(Json(s.catalog.update_product(id, req.into_draft()?).await?))
}

async fn delete_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Multipart form with a `productId` text field and an `image` file field.
async fn upload_image(State(s): State<AppState>, mut form: Multipart) -> Result<Json<serde_json::Value>> {
    let mut product_id = None;
    let mut image = None;
    while let Some(field) = form.next_field().await.map_err(|e| EcommerceError::invalid(e.to_string()))? {
        match field.name() {
            Some("productId") => {
                let raw = field.text().await.map_err(|e| EcommerceError::invalid(e.to_string()))?;
                product_id = Some(Uuid::parse_str(raw.trim()).map_err(|_| EcommerceError::invalid("productId is not a valid id"))?);
            }
            Some("image") => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let bytes = field.bytes().await.map_err(|e| EcommerceError::invalid(e.to_string()))?;
                image = Some((file_name, bytes));
            }
            _ => {}
        }
    }
    let product_id = product_id.ok_or_else(|| EcommerceError::invalid("productId is required"))?;
    let (file_name, bytes) = image.ok_or_else(|| EcommerceError::invalid("image file is required"))?;
    let locator = s.catalog.upload_image(product_id, &file_name, &bytes).await?;
    Ok(Json(json!({ "imageUrl": locator })))
}
