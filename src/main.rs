//! OpenSASE Storefront - single-tenant storefront API

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opensase_storefront::api::{self, AppState};
use opensase_storefront::config::Config;
use opensase_storefront::repositories::{
    CartRepository, LocalImageStore, MemoryStore, OrderRepository, PgStore, ProductRepository, RoleRepository,
    UserRepository,
};
use opensase_storefront::services::{
    CartService, CatalogService, EventPublisher, FlutterwaveGateway, IdentityService, LogPublisher, NatsPublisher,
    OrderService, PaymentService,
};

struct Stores {
    products: Arc<dyn ProductRepository>,
    carts: Arc<dyn CartRepository>,
    orders: Arc<dyn OrderRepository>,
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
}

impl Stores {
    fn shared<T>(store: Arc<T>) -> Self
    where
        T: ProductRepository + CartRepository + OrderRepository + UserRepository + RoleRepository + 'static,
    {
        Self { products: store.clone(), carts: store.clone(), orders: store.clone(), users: store.clone(), roles: store }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let stores = match &config.database_url {
        Some(url) => {
            let pg = PgStore::connect(url, config.database_max_connections).await?;
            pg.migrate().await?;
            Stores::shared(Arc::new(pg))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            Stores::shared(Arc::new(MemoryStore::new()))
        }
    };

    let events: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Arc::new(NatsPublisher::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events will only be logged");
                Arc::new(LogPublisher)
            }
        },
        None => Arc::new(LogPublisher),
    };

    let images = LocalImageStore::new(&config.image_root);
    let images_dir = images.images_dir();

    let identity = IdentityService::new(stores.users.clone(), stores.roles, config.jwt.clone());
    identity.seed_roles().await?;

    let state = AppState {
        cart: CartService::new(stores.carts, stores.products.clone(), events.clone()),
        orders: OrderService::new(stores.orders, stores.users, events.clone()),
        catalog: CatalogService::new(stores.products, Arc::new(images), events),
        identity,
        payments: PaymentService::new(Arc::new(FlutterwaveGateway::new(&config.payment)?)),
    };

    let app = api::router(state, images_dir);
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("🚀 OpenSASE Storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
