use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::aggregates::{Bundle, Order, OrderDraft, OrderError, OrderItem, OrderStats, OrderStatus};
use crate::domain::checkout::{steps_for, CheckoutStep, ContractRequest, FieldErrors, LineRequest};
use crate::domain::email;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::services::OutgoingEmail;
use crate::{Result, StoreError};

/// What the request has to prove before an order is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Submission { Order, Contract }

fn check_form(req: &ContractRequest, kind: Submission) -> FieldErrors {
    let with_installation = req.include_installation;
    match kind {
        Submission::Contract => req.form.validate_all(with_installation),
        Submission::Order => steps_for(with_installation).into_iter()
            .filter(|s| *s != CheckoutStep::Review)
            .flat_map(|s| req.form.validate_step(s))
            .collect(),
    }
}

/// Rebuilds the bundle from catalog prices; the browser only names products and quantities.
pub(crate) async fn price_lines(s: &AppState, lines: &[LineRequest], include_installation: bool) -> Result<Bundle> {
    if lines.is_empty() { return Err(OrderError::NoItems.into()); }
    let ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
    let products = s.repo.get_products(&ids).await?;
    let mut bundle = Bundle::new();
    for line in lines {
        let product = products.iter().find(|p| p.id == line.product_id).cloned().ok_or(StoreError::ProductNotFound(line.product_id))?;
        bundle.add_item(product, line.quantity)?;
    }
    if include_installation { bundle.set_installation(s.config.installation_fee)?; }
    Ok(bundle)
}

async fn place(s: &AppState, req: ContractRequest, kind: Submission) -> Result<Order> {
    let errors = check_form(&req, kind);
    if !errors.is_empty() { return Err(StoreError::fields(errors)); }
    let bundle = price_lines(s, &req.items, req.include_installation).await?;

    let form = &req.form;
    let items = bundle.items().iter().map(|i| OrderItem {
        product_id: Some(i.product.id),
        title: i.product.title.clone(),
        category: i.product.category.clone(),
        quantity: i.quantity,
        price_at_time: i.unit_price(),
        cost_at_time: i.product.cost,
        taxable: i.product.is_taxable(),
    }).collect();
    let order = Order::place(OrderDraft {
        contact: form.contact(),
        shipping_address: form.shipping_address(),
        installation: if req.include_installation { form.installation_details() } else { None },
        installation_price: bundle.installation(),
        payment_method: form.payment_method.unwrap_or_default(),
        po_number: Some(form.po_number.trim().to_string()).filter(|p| !p.is_empty()),
        signature: form.signature.clone().filter(|sig| !sig.trim().is_empty()),
        items,
        notes: Some(form.notes.trim().to_string()).filter(|n| !n.is_empty()),
    })?;

    if let Some(quoted) = req.quoted {
        if quoted.total != order.total || quoted.tax != order.tax {
            tracing::warn!(
                quoted_total = %quoted.total, total = %order.total, quoted_tax = %quoted.tax, tax = %order.tax,
                "client totals differ from server pricing"
            );
        }
    }

    let order = s.repo.create_order(order).await?;
    tracing::info!(order_id = order.id, total = %order.total, signed = order.is_signed(), "order placed");
    s.events.publish(DomainEvent::order_placed(&order)).await;

    // The order stands even if the confirmation cannot be delivered.
    let confirmation = OutgoingEmail::new(&order.contact.email, email::order_confirmation(&order, &s.config.business))
        .reply_to(&s.config.business.email);
    if let Err(e) = s.mailer.send(confirmation).await {
        tracing::warn!(order_id = order.id, error = %e, "order confirmation not sent");
    }
    Ok(order)
}

pub async fn create_order(State(s): State<AppState>, Json(req): Json<ContractRequest>) -> Result<(StatusCode, Json<Order>)> {
    let order = place(&s, req, Submission::Order).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn create_contract(State(s): State<AppState>, Json(req): Json<ContractRequest>) -> Result<(StatusCode, Json<Order>)> {
    let order = place(&s, req, Submission::Contract).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(State(s): State<AppState>) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.repo.list_orders().await?))
}

pub async fn get_order(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<Order>> {
    Ok(Json(s.repo.get_order(id).await?.ok_or(StoreError::OrderNotFound(id))?))
}

pub async fn order_stats(State(s): State<AppState>) -> Result<Json<OrderStats>> {
    let orders = s.repo.list_orders().await?;
    Ok(Json(OrderStats::from_orders(&orders)))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

pub async fn update_status(State(s): State<AppState>, Path(id): Path<i64>, Json(r): Json<StatusUpdate>) -> Result<Json<Order>> {
    let status: OrderStatus = r.status.trim().parse()?;
    let (order, previous) = s.repo.update_order_status(id, status).await?.ok_or(StoreError::OrderNotFound(id))?;
    tracing::info!(order_id = id, from = %previous, to = %status, "order status changed");
    s.events.publish(DomainEvent::Order(OrderEvent::StatusChanged { order_id: id, from: previous, to: status })).await;
    Ok(Json(order))
}

pub async fn delete_order(State(s): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    if !s.repo.delete_order(id).await? { return Err(StoreError::OrderNotFound(id)); }
    tracing::info!(order_id = id, "order deleted");
    s.events.publish(DomainEvent::Order(OrderEvent::Deleted { order_id: id })).await;
    Ok(StatusCode::NO_CONTENT)
}
