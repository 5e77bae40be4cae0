//! Product catalog management.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::aggregates::{Product, ProductDraft};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::repositories::{ImageStore, ProductRepository};
use crate::services::events::EventPublisher;
use crate::{EcommerceError, Entity, Result};

#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
    images: Arc<dyn ImageStore>,
    events: Arc<dyn EventPublisher>,
}

impl CatalogService {
    pub fn new(products: Arc<dyn ProductRepository>, images: Arc<dyn ImageStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self { products, images, events }
    }

    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        let product = Product::create(draft)?;
        self.products.insert(&product).await?;
        info!(product_id = %product.id, name = %product.name, "Product created");
        self.events.publish(vec![DomainEvent::Product(ProductEvent::Created { product_id: product.id })]).await;
        Ok(product)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        self.products.find(id).await
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.products.list().await
    }

    pub async fn update_product(&self, id: Uuid, draft: ProductDraft) -> Result<Product> {
        let mut product = self.products.find(id).await?.ok_or(EcommerceError::NotFound(Entity::Product))?;
        product.apply(draft)?;
        if !self.products.update(&product).await? {
            return Err(EcommerceError::NotFound(Entity::Product));
        }
        info!(product_id = %id, "Product updated");
        self.events.publish(vec![DomainEvent::Product(ProductEvent::Updated { product_id: id })]).await;
        Ok(product)
    }

    /// Hard delete; cart lines holding the product are removed with it.
    pub async fn delete_product(&self, id: Uuid) -> Result<()> {
        if !self.products.delete(id).await? {
            warn!(product_id = %id, "Product not found");
            return Err(EcommerceError::NotFound(Entity::Product));
        }
        info!(product_id = %id, "Product deleted");
        self.events.publish(vec![DomainEvent::Product(ProductEvent::Deleted { product_id: id })]).await;
        Ok(())
    }

    /// Stores the file and points the product's image locator at it.
    pub async fn upload_image(&self, product_id: Uuid, file_name: &str, bytes: &[u8]) -> Result<String> {
        let mut product = self.products.find(product_id).await?.ok_or(EcommerceError::NotFound(Entity::Product))?;
        if bytes.is_empty() {
            return Err(EcommerceError::invalid("image file is empty"));
        }
        let locator = self.images.store(file_name, bytes).await?;
        if let Err(e) = self.attach_image(&mut product, &locator).await {
            if let Err(cleanup) = self.images.remove(&locator).await {
                warn!(%product_id, %locator, error = %cleanup, "Failed to remove orphaned image");
            }
            return Err(e);
        }
        self.events.publish(vec![DomainEvent::Product(ProductEvent::ImageUploaded { product_id, locator: locator.clone() })]).await;
        Ok(locator)
    }

    async fn attach_image(&self, product: &mut Product, locator: &str) -> Result<()> {
        product.set_image(locator.to_string())?;
        if !self.products.update(product).await? {
            return Err(EcommerceError::NotFound(Entity::Product));
        }
        Ok(())
    }
}
