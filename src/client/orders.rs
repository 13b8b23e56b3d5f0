//! Admin orders console: list, reporting, status changes, deletes and the
//! email composer. Local state only changes after the server confirms.

use crate::api::templates::EmailDraft;
use crate::client::{Api, SendTemplate, Toast, Transport};
use crate::domain::aggregates::{Order, OrderStats, OrderStatus};
use crate::domain::email::EmailTemplate;

#[derive(Debug, Clone, PartialEq)]
pub struct Composer {
    pub order_id: i64,
    pub template: EmailTemplate,
    pub instructions: String,
    pub draft: Option<EmailDraft>,
    busy: bool,
}

impl Composer {
    pub fn is_busy(&self) -> bool { self.busy }
}

pub struct OrdersConsole<T> {
    api: Api<T>,
    orders: Vec<Order>,
    toasts: Vec<Toast>,
    composer: Option<Composer>,
}

impl<T: Transport> OrdersConsole<T> {
    pub fn new(api: Api<T>) -> Self { Self { api, orders: Vec::new(), toasts: Vec::new(), composer: None } }

    pub fn api(&self) -> &Api<T> { &self.api }
    pub fn orders(&self) -> &[Order] { &self.orders }
    pub fn toasts(&self) -> &[Toast] { &self.toasts }
    pub fn composer(&self) -> Option<&Composer> { self.composer.as_ref() }

    /// Re-derived from the loaded list on every call.
    pub fn stats(&self) -> OrderStats { OrderStats::from_orders(&self.orders) }

    pub async fn load(&mut self) -> bool {
        match self.api.list_orders().await {
            Ok(orders) => { self.orders = orders; true }
            Err(e) => { self.toasts.push(Toast::error(format!("Failed to load orders: {}", e))); false }
        }
    }

    pub async fn update_status(&mut self, id: i64, status: OrderStatus) -> bool {
        match self.api.update_order_status(id, status).await {
            Ok(updated) => {
                if let Some(order) = self.orders.iter_mut().find(|o| o.id == id) {
                    order.status = updated.status;
                    order.updated_at = updated.updated_at;
                }
                self.toasts.push(Toast::success(format!("Order #{} marked {}", id, status)));
                true
            }
            Err(e) => { self.toasts.push(Toast::error(format!("Failed to update order #{}: {}", id, e))); false }
        }
    }

    pub async fn delete(&mut self, id: i64) -> bool {
        match self.api.delete_order(id).await {
            Ok(()) => {
                self.orders.retain(|o| o.id != id);
                self.toasts.push(Toast::success(format!("Order #{} deleted", id)));
                true
            }
            Err(e) => { self.toasts.push(Toast::error(format!("Failed to delete order #{}: {}", id, e))); false }
        }
    }

    pub async fn resend(&mut self, id: i64) -> bool {
        match self.api.resend_email(id).await {
            Ok(()) => { self.toasts.push(Toast::success("Confirmation email sent")); true }
            Err(e) => { self.toasts.push(Toast::error(format!("Failed to resend email: {}", e))); false }
        }
    }

    /// Opens the composer on an order and loads the built-in rendering of `template`.
    pub async fn compose(&mut self, order_id: i64, template: EmailTemplate) -> bool {
        let draft = match self.api.preview_template(order_id, template).await {
            Ok(draft) => Some(draft),
            Err(e) => { self.toasts.push(Toast::error(format!("Preview unavailable: {}", e))); None }
        };
        let loaded = draft.is_some();
        self.composer = Some(Composer { order_id, template, instructions: String::new(), draft, busy: false });
        loaded
    }

    pub fn set_instructions(&mut self, text: impl Into<String>) {
        if let Some(c) = self.composer.as_mut() { c.instructions = text.into(); }
    }

    pub fn edit_draft(&mut self, subject: impl Into<String>, html: impl Into<String>) {
        if let Some(draft) = self.composer.as_mut().and_then(|c| c.draft.as_mut()) {
            draft.subject = subject.into();
            draft.html = html.into();
        }
    }

    /// Marks the composer busy; `None` when closed or a request is already in flight.
    fn claim_composer(&mut self) -> Option<(i64, EmailTemplate, String, Option<EmailDraft>)> {
        let c = self.composer.as_mut().filter(|c| !c.busy)?;
        c.busy = true;
        Some((c.order_id, c.template, c.instructions.clone(), c.draft.clone()))
    }

    fn release_composer(&mut self) {
        if let Some(c) = self.composer.as_mut() { c.busy = false; }
    }

    pub async fn generate(&mut self) -> bool {
        let Some((order_id, template, instructions, _)) = self.claim_composer() else { return false };
        let instructions = Some(instructions.trim()).filter(|t| !t.is_empty());
        let result = self.api.generate_email(order_id, template, instructions).await;
        self.release_composer();
        match result {
            Ok(draft) => {
                if let Some(c) = self.composer.as_mut() { c.draft = Some(draft); }
                true
            }
            Err(e) => { self.toasts.push(Toast::error(format!("Failed to generate email: {}", e))); false }
        }
    }

    /// Sends the composer's current draft; on success the composer closes.
    pub async fn send(&mut self) -> bool {
        let Some((order_id, template, instructions, draft)) = self.claim_composer() else { return false };
        let message = SendTemplate {
            template,
            subject: draft.as_ref().map(|d| d.subject.clone()),
            html: draft.as_ref().map(|d| d.html.clone()),
            instructions: Some(instructions).filter(|t| !t.trim().is_empty()),
        };
        let result = self.api.send_template(order_id, &message).await;
        self.release_composer();
        match result {
            Ok(()) => {
                self.composer = None;
                self.toasts.push(Toast::success(format!("{} sent", template.label())));
                true
            }
            Err(e) => { self.toasts.push(Toast::error(format!("Failed to send email: {}", e))); false }
        }
    }

    pub fn close_composer(&mut self) { self.composer = None; }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{server_error, FakeTransport};
    use crate::domain::aggregates::order::tests::draft;
    use reqwest::Method;
    use serde_json::{json, Value};

    fn order(id: i64) -> Order {
        let mut o = Order::place(draft()).unwrap();
        o.id = id;
        o
    }

    async fn loaded(ids: &[i64]) -> OrdersConsole<FakeTransport> {
        let transport = FakeTransport::default();
        let orders: Vec<Order> = ids.iter().map(|id| order(*id)).collect();
        transport.reply(Ok(serde_json::to_value(&orders).unwrap()));
        let mut console = OrdersConsole::new(Api::new(transport));
        assert!(console.load().await);
        console
    }

    #[tokio::test]
    async fn test_status_update_patches_only_target() {
        let mut console = loaded(&[41, 42, 43]).await;
        let mut updated = order(42);
        updated.status = OrderStatus::Completed;
        console.api().transport().reply(Ok(serde_json::to_value(&updated).unwrap()));

        assert!(console.update_status(42, OrderStatus::Completed).await);
        let statuses: Vec<OrderStatus> = console.orders().iter().map(|o| o.status).collect();
        assert_eq!(statuses, vec![OrderStatus::Pending, OrderStatus::Completed, OrderStatus::Pending]);
        assert!(!console.toasts().last().unwrap().is_error());
    }

    #[tokio::test]
    async fn test_failed_status_update_leaves_list() {
        let mut console = loaded(&[1, 2]).await;
        console.api().transport().reply(Err(server_error("db down")));
        assert!(!console.update_status(1, OrderStatus::Cancelled).await);
        assert!(console.orders().iter().all(|o| o.status == OrderStatus::Pending));
        let toast = console.toasts().last().unwrap();
        assert!(toast.is_error() && toast.message.contains("db down"));
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one() {
        let mut console = loaded(&[41, 42, 43]).await;
        assert!(console.delete(42).await);
        let ids: Vec<i64> = console.orders().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![41, 43]);

        let deletes: Vec<_> = console.api().transport().calls().into_iter().filter(|(m, _, _)| *m == Method::DELETE).collect();
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].1, "/api/admin/orders/42");
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_entry() {
        let mut console = loaded(&[42]).await;
        console.api().transport().reply(Err(server_error("nope")));
        assert!(!console.delete(42).await);
        assert_eq!(console.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_stats_follow_local_list() {
        let mut console = loaded(&[1, 2]).await;
        assert_eq!(console.stats().order_count, 2);
        console.delete(1).await;
        assert_eq!(console.stats().order_count, 1);
    }

    fn draft_json(subject: &str) -> Value {
        json!({ "template": "payment_reminder", "subject": subject, "html": "<p>x</p>", "preview": "<iframe sandbox=\"\"></iframe>" })
    }

    #[tokio::test]
    async fn test_compose_generate_send() {
        let mut console = loaded(&[5]).await;
        let transport = console.api().transport();
        transport.reply(Ok(draft_json("Built-in")));
        transport.reply(Ok(draft_json("From AI")));

        assert!(console.compose(5, EmailTemplate::PaymentReminder).await);
        console.set_instructions("Mention net-30");
        assert!(console.generate().await);
        assert_eq!(console.composer().unwrap().draft.as_ref().unwrap().subject, "From AI");

        console.edit_draft("Edited", "<p>edited</p>");
        assert!(console.send().await);
        assert!(console.composer().is_none());

        let calls = console.api().transport().calls();
        let (method, path, body) = calls.last().unwrap();
        assert_eq!(*method, Method::POST);
        assert_eq!(path, "/api/admin/orders/5/send-template");
        let body = body.as_ref().unwrap();
        assert_eq!(body["subject"], "Edited");
        assert_eq!(body["template"], "payment_reminder");
        let generate = &calls[calls.len() - 2];
        assert_eq!(generate.2.as_ref().unwrap()["instructions"], "Mention net-30");
    }

    #[tokio::test]
    async fn test_busy_composer_rejects_second_request() {
        let mut console = loaded(&[5]).await;
        console.api().transport().reply(Ok(draft_json("Built-in")));
        console.compose(5, EmailTemplate::ThankYou).await;
        console.composer.as_mut().unwrap().busy = true;
        let before = console.api().transport().calls().len();
        assert!(!console.send().await);
        assert!(!console.generate().await);
        assert_eq!(console.api().transport().calls().len(), before);
    }

    #[tokio::test]
    async fn test_failed_send_keeps_composer_open() {
        let mut console = loaded(&[5]).await;
        console.api().transport().reply(Ok(draft_json("Built-in")));
        console.compose(5, EmailTemplate::ThankYou).await;
        console.api().transport().reply(Err(server_error("relay down")));
        assert!(!console.send().await);
        let composer = console.composer().unwrap();
        assert!(!composer.is_busy());
        assert!(console.toasts().last().unwrap().is_error());
    }
}
