//! Aggregates module
pub mod product;
pub mod order;
pub mod bundle;

pub use product::{Product, ProductDraft};
pub use order::{Address, ContactInfo, InstallationDetails, Order, OrderDraft, OrderError, OrderItem, OrderStats, OrderStatus, PaymentMethod};
pub use bundle::{Bundle, BundleError, BundleItem};
