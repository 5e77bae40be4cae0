//! OpenSASE Storefront
//!
//! Single-tenant storefront API built on the OpenSASE e-commerce core.
//!
//! ## Features
//! - Product catalog management with image upload
//! - Per-user shopping cart with optimistic concurrency
//! - Order recording with snapshot line prices
//! - Account registration and bearer tokens
//! - Payment initiation and verification through an external gateway

pub mod api;
pub mod config;
pub mod domain;
pub mod repositories;
pub mod services;

use std::fmt;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Kind of record an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Product,
    Cart,
    CartItem,
    Order,
    User,
    Role,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Product => "Product",
            Self::Cart => "Cart",
            Self::CartItem => "Cart item",
            Self::Order => "Order",
            Self::User => "User",
            Self::Role => "Role",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} was modified concurrently")]
    ConcurrencyConflict(Entity),

    #[error("{0} reference does not resolve")]
    InvalidReference(Entity),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl EcommerceError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn storage(msg: impl fmt::Display) -> Self {
        Self::StorageError(msg.to_string())
    }

    /// Whether re-reading state and re-applying the request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}

impl From<sqlx::Error> for EcommerceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_string())
            }
            _ => Self::StorageError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(EcommerceError::NotFound(Entity::CartItem).to_string(), "Cart item not found");
        assert_eq!(
            EcommerceError::InvalidReference(Entity::User).to_string(),
            "User reference does not resolve"
        );
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(EcommerceError::ConcurrencyConflict(Entity::CartItem).is_retryable());
        assert!(!EcommerceError::storage("boom").is_retryable());
        assert!(!EcommerceError::NotFound(Entity::Cart).is_retryable());
    }
}
