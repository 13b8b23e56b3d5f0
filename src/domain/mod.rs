//! Business rules shared by the HTTP service and the client controllers.
pub mod aggregates;
pub mod catalog;
pub mod checkout;
pub mod email;
pub mod events;
pub mod pricing;
pub mod value_objects;
