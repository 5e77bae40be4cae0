//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod user;

pub use product::{Product, ProductCategory, ProductDraft, ProductError};
pub use order::{Order, OrderDetail, OrderDraft, OrderError, LineDraft};
pub use cart::{Cart, CartChanges, CartItem, ItemWrite};
pub use user::{Role, User};
