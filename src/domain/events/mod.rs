//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::aggregates::{Order, OrderStatus, Product};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: i64, title: String },
    Updated { product_id: i64 },
    Deleted { product_id: i64 },
    CustomServiceCreated { product_id: i64, title: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: i64, email: String, total: Decimal, signed: bool },
    StatusChanged { order_id: i64, from: OrderStatus, to: OrderStatus },
    Deleted { order_id: i64 },
    EmailSent { order_id: i64, template: String },
}

impl DomainEvent {
    pub fn order_placed(order: &Order) -> Self {
        DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id, email: order.contact.email.clone(), total: order.total.amount(), signed: order.is_signed(),
        })
    }

    pub fn product_created(product: &Product) -> Self {
        if product.is_custom {
            DomainEvent::Product(ProductEvent::CustomServiceCreated { product_id: product.id, title: product.title.clone() })
        } else {
            DomainEvent::Product(ProductEvent::Created { product_id: product.id, title: product.title.clone() })
        }
    }

    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::Product(ProductEvent::Created { .. }) => "catalog.product.created",
            DomainEvent::Product(ProductEvent::Updated { .. }) => "catalog.product.updated",
            DomainEvent::Product(ProductEvent::Deleted { .. }) => "catalog.product.deleted",
            DomainEvent::Product(ProductEvent::CustomServiceCreated { .. }) => "catalog.custom_service.created",
            DomainEvent::Order(OrderEvent::Placed { .. }) => "orders.placed",
            DomainEvent::Order(OrderEvent::StatusChanged { .. }) => "orders.status_changed",
            DomainEvent::Order(OrderEvent::Deleted { .. }) => "orders.deleted",
            DomainEvent::Order(OrderEvent::EmailSent { .. }) => "orders.email_sent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_shape() {
        let event = DomainEvent::Order(OrderEvent::StatusChanged { order_id: 42, from: OrderStatus::Pending, to: OrderStatus::Completed });
        assert_eq!(event.subject(), "orders.status_changed");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["aggregate"], "order");
        assert_eq!(json["event"]["type"], "status_changed");
        assert_eq!(json["event"]["to"], "completed");
    }
}
