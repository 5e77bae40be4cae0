pub mod cart;
pub mod catalog;
pub mod events;
pub mod identity;
pub mod order;
pub mod payment;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use events::{EventPublisher, LogPublisher, NatsPublisher};
pub use identity::{Claims, IdentityService};
pub use order::OrderService;
pub use payment::{FlutterwaveGateway, PaymentGateway, PaymentRequest, PaymentService, PaymentStatus};
