//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Money, MoneyError, Quantity};

pub const DEFAULT_STATUS: &str = "Pending";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: String,
    pub status: String,
    pub order_date: DateTime<Utc>,
    pub details: Vec<OrderDetail>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// One purchased line. `price` is captured when the order is written and never follows the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail { pub id: Uuid, pub product_id: Uuid, pub quantity: Quantity, pub price: Money }

/// Client-supplied order content, used for both creation and wholesale update.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderDraft {
    pub status: Option<String>,
    pub order_date: DateTime<Utc>,
    pub details: Vec<LineDraft>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineDraft { pub product_id: Uuid, pub quantity: i32, pub price: Decimal }

impl OrderDetail {
    pub fn line_total(&self) -> Result<Money, MoneyError> { self.price.multiply(self.quantity) }
}

impl Order {
    pub fn create(user_id: impl Into<String>, draft: OrderDraft) -> Result<Self, OrderError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() { return Err(OrderError::MissingUser); }
        let details = Self::build_details(draft.details)?;
        let id = Uuid::now_v7();
        let mut order = Self {
            id, user_id: user_id.clone(), status: Self::status_or_default(draft.status),
            order_date: draft.order_date, details, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Created { order_id: id, user_id }));
        Ok(order)
    }

    /// Rebuilds an order read from storage.
    pub fn restore(id: Uuid, user_id: String, status: String, order_date: DateTime<Utc>, details: Vec<OrderDetail>) -> Self {
        Self { id, user_id, status, order_date, details, events: vec![] }
    }

    /// Replaces status, date and every detail line.
    pub fn apply(&mut self, draft: OrderDraft) -> Result<(), OrderError> {
        self.details = Self::build_details(draft.details)?;
        self.status = Self::status_or_default(draft.status);
        self.order_date = draft.order_date;
        self.raise_event(DomainEvent::Order(OrderEvent::Updated { order_id: self.id, status: self.status.clone() }));
        Ok(())
    }

    pub fn total(&self) -> Result<Money, MoneyError> {
        self.details.iter().try_fold(Money::zero(), |acc, d| acc.add(&d.line_total()?))
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }

    fn status_or_default(status: Option<String>) -> String {
        status.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).unwrap_or_else(|| DEFAULT_STATUS.to_string())
    }

    fn build_details(lines: Vec<LineDraft>) -> Result<Vec<OrderDetail>, OrderError> {
        lines.into_iter().map(|l| {
            let quantity = Quantity::new(l.quantity).map_err(|_| OrderError::InvalidQuantity(l.product_id))?;
            let price = Money::new(l.price).map_err(|_| OrderError::InvalidPrice(l.product_id))?;
            Ok(OrderDetail { id: Uuid::now_v7(), product_id: l.product_id, quantity, price })
        }).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { MissingUser, InvalidQuantity(Uuid), InvalidPrice(Uuid) }
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUser => write!(f, "Order requires a user id"),
            Self::InvalidQuantity(p) => write!(f, "Quantity for product {p} must be greater than zero"),
            Self::InvalidPrice(p) => write!(f, "Price for product {p} must be non-negative with at most two decimals, up to {}", Money::MAX),
        }
    }
}

impl From<OrderError> for crate::EcommerceError {
    fn from(err: OrderError) -> Self { crate::EcommerceError::InvalidArgument(err.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, cents: i64) -> LineDraft {
        LineDraft { product_id: Uuid::now_v7(), quantity, price: Decimal::new(cents, 2) }
    }

    #[test]
    fn test_order_defaults_to_pending() {
        let mut order = Order::create("CUST001", OrderDraft { status: None, order_date: Utc::now(), details: vec![line(2, 1000)] }).unwrap();
        assert_eq!(order.status, "Pending");
        assert_eq!(order.total().unwrap().amount(), Decimal::new(2000, 2));
        assert!(matches!(order.take_events().as_slice(), [DomainEvent::Order(OrderEvent::Created { .. })]));
    }

    #[test]
    fn test_order_update_replaces_lines() {
        let mut order = Order::create("CUST001", OrderDraft { status: None, order_date: Utc::now(), details: vec![line(1, 100), line(1, 200)] }).unwrap();
        order.apply(OrderDraft { status: Some("Shipped".into()), order_date: Utc::now(), details: vec![line(3, 100)] }).unwrap();
        assert_eq!(order.status, "Shipped");
        assert_eq!(order.details.len(), 1);
        assert_eq!(order.user_id, "CUST001");
    }

    #[test]
    fn test_order_rejects_bad_lines() {
        let bad = line(0, 100);
        let product_id = bad.product_id;
        let err = Order::create("CUST001", OrderDraft { status: None, order_date: Utc::now(), details: vec![bad] }).unwrap_err();
        assert_eq!(err, OrderError::InvalidQuantity(product_id));
        assert_eq!(
            Order::create(" ", OrderDraft { status: None, order_date: Utc::now(), details: vec![] }).unwrap_err(),
            OrderError::MissingUser
        );

        let oversized = LineDraft { price: Decimal::from_i128_with_scale(7 * 10i128.pow(28), 2), ..line(1, 0) };
        let product_id = oversized.product_id;
        let err = Order::create("CUST001", OrderDraft { status: None, order_date: Utc::now(), details: vec![oversized] }).unwrap_err();
        assert_eq!(err, OrderError::InvalidPrice(product_id));
    }
}
