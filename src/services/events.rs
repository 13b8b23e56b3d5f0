//! Best-effort domain event publication. A failed publish is logged and never
//! fails the request that produced the event.

use std::sync::{Arc, Mutex};

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventBus {
    nats: Option<async_nats::Client>,
    recorded: Option<Arc<Mutex<Vec<DomainEvent>>>>,
}

impl EventBus {
    pub fn disabled() -> Self { Self::default() }

    pub fn nats(client: async_nats::Client) -> Self { Self { nats: Some(client), recorded: None } }

    /// Connects when a URL is given; an unreachable server leaves publishing off.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(url, "connected to NATS");
                Self::nats(client)
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "NATS unavailable, events disabled");
                Self::disabled()
            }
        }
    }

    /// Keeps every published event in memory; used by handler tests.
    pub fn recording() -> Self { Self { nats: None, recorded: Some(Arc::new(Mutex::new(Vec::new()))) } }

    pub fn recorded(&self) -> Vec<DomainEvent> {
        self.recorded.as_ref().and_then(|r| r.lock().ok().map(|v| v.clone())).unwrap_or_default()
    }

    pub async fn publish(&self, event: DomainEvent) {
        if let Some(ref recorded) = self.recorded {
            if let Ok(mut events) = recorded.lock() { events.push(event.clone()); }
        }
        let Some(ref client) = self.nats else { return };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => { tracing::error!(error = %e, "failed to serialize event"); return; }
        };
        if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
            tracing::warn!(subject = event.subject(), error = %e, "failed to publish event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::OrderEvent;

    #[tokio::test]
    async fn test_disabled_bus_is_noop() {
        let bus = EventBus::disabled();
        bus.publish(DomainEvent::Order(OrderEvent::Deleted { order_id: 1 })).await;
        assert!(bus.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_recording_bus_keeps_order() {
        let bus = EventBus::recording();
        bus.publish(DomainEvent::Order(OrderEvent::Deleted { order_id: 1 })).await;
        bus.publish(DomainEvent::Order(OrderEvent::Deleted { order_id: 2 })).await;
        let subjects: Vec<_> = bus.recorded().iter().map(DomainEvent::subject).collect();
        assert_eq!(subjects, vec!["orders.deleted", "orders.deleted"]);
    }

    #[test]
    fn test_event_payload_shape() {
        let json = serde_json::to_value(DomainEvent::Order(OrderEvent::Deleted { order_id: 7 })).unwrap();
        assert_eq!(json["aggregate"], "order");
        assert_eq!(json["event"]["type"], "deleted");
        assert_eq!(json["event"]["order_id"], 7);
    }
}
