//! Order recording.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderDraft};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::repositories::{OrderRepository, UserRepository};
use crate::services::events::EventPublisher;
use crate::{EcommerceError, Entity, Result};

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    users: Arc<dyn UserRepository>,
    events: Arc<dyn EventPublisher>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderRepository>, users: Arc<dyn UserRepository>, events: Arc<dyn EventPublisher>) -> Self {
        Self { orders, users, events }
    }

    /// Records an order for an existing user. Line prices are stored exactly as supplied.
    pub async fn create_order(&self, user_id: &str, draft: OrderDraft) -> Result<Order> {
        info!(user_id, lines = draft.details.len(), "Creating order");
        if !self.users.exists(user_id).await? {
            warn!(user_id, "Order references an unknown user");
            return Err(EcommerceError::InvalidReference(Entity::User));
        }
        let mut order = Order::create(user_id, draft)?;
        self.orders.insert(&order).await?;
        self.events.publish(order.take_events()).await;
        info!(order_id = %order.id, "Order created");
        Ok(order)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        self.orders.find(id).await
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        self.orders.list().await
    }

    pub async fn orders_for_user(&self, user_id: &str) -> Result<Vec<Order>> {
        self.orders.list_by_user(user_id).await
    }

    /// Replaces status, date and lines of an existing order.
    pub async fn update_order(&self, id: Uuid, draft: OrderDraft) -> Result<Order> {
        info!(order_id = %id, "Updating order");
        let mut order = self.orders.find(id).await?.ok_or(EcommerceError::NotFound(Entity::Order))?;
        order.apply(draft)?;
        if !self.orders.update(&order).await? {
            return Err(EcommerceError::NotFound(Entity::Order));
        }
        self.events.publish(order.take_events()).await;
        Ok(order)
    }

    /// Hard delete. A second delete of the same id reports `NotFound`.
    pub async fn delete_order(&self, id: Uuid) -> Result<()> {
        info!(order_id = %id, "Deleting order");
        if !self.orders.delete(id).await? {
            warn!(order_id = %id, "Order not found");
            return Err(EcommerceError::NotFound(Entity::Order));
        }
        self.events.publish(vec![DomainEvent::Order(OrderEvent::Deleted { order_id: id })]).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{LineDraft, User};
    use crate::repositories::MemoryStore;
    use crate::services::events::testing::RecordingPublisher;
    use chrono::Utc;
    use rust_decimal::Decimal;

    async fn fixture() -> (Arc<MemoryStore>, OrderService, String) {
        let store = Arc::new(MemoryStore::new());
        let user = User::new("buyer", "buyer@example.com", "hash".into());
        UserRepository::insert(store.as_ref(), &user).await.unwrap();
        let service = OrderService::new(store.clone(), store.clone(), Arc::new(RecordingPublisher::default()));
        (store, service, user.id.to_string())
    }

    fn draft(lines: Vec<(i32, i64)>) -> OrderDraft {
        OrderDraft {
            status: None,
            order_date: Utc::now(),
            details: lines.into_iter().map(|(q, c)| LineDraft { product_id: Uuid::now_v7(), quantity: q, price: Decimal::new(c, 2) }).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_requires_existing_user() {
        let (store, service, _) = fixture().await;
        let err = service.create_order(&Uuid::now_v7().to_string(), draft(vec![(1, 100)])).await.unwrap_err();
        assert!(matches!(err, EcommerceError::InvalidReference(Entity::User)));
        let err = service.create_order("not-a-uuid", draft(vec![(1, 100)])).await.unwrap_err();
        assert!(matches!(err, EcommerceError::InvalidReference(Entity::User)));
        assert!(OrderRepository::list(store.as_ref()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let (_, service, user_id) = fixture().await;
        let order = service.create_order(&user_id, draft(vec![(2, 1000), (1, 550)])).await.unwrap();
        assert_eq!(order.status, "Pending");
        let loaded = service.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(loaded.details.len(), 2);
        assert_eq!(loaded.total().unwrap().amount(), Decimal::new(2550, 2));
        assert_eq!(service.orders_for_user(&user_id).await.unwrap().len(), 1);
        assert!(service.orders_for_user("someone-else").await.unwrap().is_empty());
        assert!(service.get_order(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_lines_persist_nothing() {
        let (store, service, user_id) = fixture().await;
        let err = service.create_order(&user_id, draft(vec![(1, 100), (0, 100)])).await.unwrap_err();
        assert!(matches!(err, EcommerceError::InvalidArgument(_)));
        assert!(OrderRepository::list(store.as_ref()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_and_missing_is_not_found() {
        let (_, service, user_id) = fixture().await;
        let order = service.create_order(&user_id, draft(vec![(1, 100), (1, 200)])).await.unwrap();
        let mut patch = draft(vec![(4, 100)]);
        patch.status = Some("Shipped".into());
        let updated = service.update_order(order.id, patch).await.unwrap();
        assert_eq!(updated.status, "Shipped");
        let loaded = service.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(loaded.details.len(), 1);
        assert_eq!(loaded.details[0].quantity.value(), 4);
        assert!(matches!(service.update_order(Uuid::now_v7(), draft(vec![])).await, Err(EcommerceError::NotFound(Entity::Order))));
    }

    #[tokio::test]
    async fn test_delete_twice_reports_not_found() {
        let (_, service, user_id) = fixture().await;
        let order = service.create_order(&user_id, draft(vec![(1, 100)])).await.unwrap();
        service.delete_order(order.id).await.unwrap();
        assert!(matches!(service.delete_order(order.id).await, Err(EcommerceError::NotFound(Entity::Order))));
        assert!(service.get_order(order.id).await.unwrap().is_none());
    }
}
