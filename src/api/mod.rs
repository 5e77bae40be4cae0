//! HTTP surface.

pub mod auth;
pub mod cart;
pub mod error;
pub mod orders;
pub mod payments;
pub mod products;

use axum::{extract::FromRef, routing::get, Json, Router};
use std::path::PathBuf;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::repositories::images::IMAGE_URL_PREFIX;
use crate::services::{CartService, CatalogService, IdentityService, OrderService, PaymentService};

pub use auth::AuthUser;

#[derive(Clone)]
pub struct AppState {
    pub cart: CartService,
    pub orders: OrderService,
    pub catalog: CatalogService,
    pub identity: IdentityService,
    pub payments: PaymentService,
}

impl FromRef<AppState> for IdentityService {
    fn from_ref(state: &AppState) -> Self { state.identity.clone() }
}

/// Builds the application router. Uploaded images are served from `images_dir`.
pub fn router(state: AppState, images_dir: impl Into<PathBuf>) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-storefront"})) }))
        .merge(auth::routes())
        .merge(products::routes())
        .merge(cart::routes())
        .merge(orders::routes())
        .merge(payments::routes())
        .nest_service(IMAGE_URL_PREFIX, ServeDir::new(images_dir.into()))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}
