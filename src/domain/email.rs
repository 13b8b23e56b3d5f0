//! Customer email templates.
//!
//! Two renderings exist for every template: a natural-language prompt handed
//! to the AI generation endpoint, and a deterministic HTML body used for
//! previews and whenever no AI backend is configured.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::aggregates::{Order, OrderItem};
use crate::domain::pricing::{PriceBreakdown, TAX_RATE};
use crate::domain::value_objects::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate { PaymentReminder, InstallationConfirmation, ShippingUpdate, ThankYou, Custom }

impl EmailTemplate {
    pub const ALL: [EmailTemplate; 5] = [Self::PaymentReminder, Self::InstallationConfirmation, Self::ShippingUpdate, Self::ThankYou, Self::Custom];

    pub fn id(&self) -> &'static str {
        match self {
            Self::PaymentReminder => "payment_reminder",
            Self::InstallationConfirmation => "installation_confirmation",
            Self::ShippingUpdate => "shipping_update",
            Self::ThankYou => "thank_you",
            Self::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PaymentReminder => "Payment Reminder",
            Self::InstallationConfirmation => "Installation Confirmation",
            Self::ShippingUpdate => "Shipping Update",
            Self::ThankYou => "Thank You",
            Self::Custom => "Custom Message",
        }
    }

    pub fn subject(&self, order: &Order, business: &BusinessProfile) -> String {
        match self {
            Self::PaymentReminder => format!("Payment reminder for order #{}", order.id),
            Self::InstallationConfirmation => format!("Your installation is scheduled (order #{})", order.id),
            Self::ShippingUpdate => format!("Shipping update for order #{}", order.id),
            Self::ThankYou => format!("Thank you from {}", business.name),
            Self::Custom => format!("About your order #{}", order.id),
        }
    }
}

impl FromStr for EmailTemplate {
    type Err = EmailError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|t| t.id() == s).ok_or_else(|| EmailError::UnknownTemplate(s.to_string()))
    }
}

/// Sender identity printed in every email footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub website: String,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        Self {
            name: "Sanctuary AV".into(),
            email: "hello@sanctuaryav.com".into(),
            phone: "(555) 010-4477".into(),
            website: "https://sanctuaryav.com".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", html_escape(p).replace('\n', "<br>")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn layout(title: &str, body: &str, business: &BusinessProfile) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body style="font-family: Arial, sans-serif; color: #1f2933; max-width: 640px; margin: 0 auto;">
<div style="background: #1e3a8a; color: #ffffff; padding: 16px 24px;"><h1 style="margin: 0; font-size: 20px;">{name}</h1></div>
<div style="padding: 24px;">
{body}
</div>
<div style="padding: 16px 24px; font-size: 12px; color: #6b7280; border-top: 1px solid #e5e7eb;">
{name} &middot; {phone} &middot; <a href="mailto:{email}">{email}</a> &middot; <a href="{website}">{website}</a>
</div>
</body>
</html>"#,
        title = html_escape(title),
        name = html_escape(&business.name),
        body = body,
        phone = html_escape(&business.phone),
        email = html_escape(&business.email),
        website = html_escape(&business.website),
    )
}

struct TableRow<'a> { title: &'a str, quantity: u32, unit: Money, line: Money }

fn items_table(rows: &[TableRow<'_>], totals: &PriceBreakdown) -> String {
    let body = rows.iter().map(|r| format!(
        r#"<tr><td style="padding: 4px 8px;">{}</td><td style="padding: 4px 8px; text-align: right;">{}</td><td style="padding: 4px 8px; text-align: right;">{}</td><td style="padding: 4px 8px; text-align: right;">{}</td></tr>"#,
        html_escape(r.title), r.quantity, r.unit, r.line,
    )).collect::<Vec<_>>().join("\n");
    let tax_label = format!("Tax ({}%)", (TAX_RATE * Decimal::ONE_HUNDRED).normalize());
    let mut summary = vec![("Subtotal".to_string(), totals.subtotal), (tax_label, totals.tax)];
    if !totals.installation.is_zero() { summary.push(("Installation".to_string(), totals.installation)); }
    summary.push(("Total".to_string(), totals.total));
    let summary = summary.into_iter().map(|(label, amount)| format!(
        r#"<tr><td colspan="3" style="padding: 4px 8px; text-align: right;"><strong>{}</strong></td><td style="padding: 4px 8px; text-align: right;">{}</td></tr>"#,
        label, amount,
    )).collect::<Vec<_>>().join("\n");
    format!(
        r#"<table style="width: 100%; border-collapse: collapse;">
<thead><tr><th style="text-align: left; padding: 4px 8px;">Item</th><th style="text-align: right; padding: 4px 8px;">Qty</th><th style="text-align: right; padding: 4px 8px;">Price</th><th style="text-align: right; padding: 4px 8px;">Total</th></tr></thead>
<tbody>
{}
</tbody>
<tfoot>
{}
</tfoot>
</table>"#,
        body, summary,
    )
}

fn order_rows(items: &[OrderItem]) -> Vec<TableRow<'_>> {
    items.iter().map(|i| TableRow { title: &i.title, quantity: i.quantity, unit: i.price_at_time, line: i.line_total() }).collect()
}

fn order_totals(order: &Order) -> PriceBreakdown {
    PriceBreakdown {
        subtotal: order.subtotal,
        taxable_subtotal: order.items.iter().filter(|i| i.taxable).map(OrderItem::line_total).sum(),
        tax: order.tax,
        installation: order.installation_price,
        total: order.total,
    }
}

fn item_summary(order: &Order) -> String {
    order.items.iter().map(|i| format!("{} x{} at {}", i.title, i.quantity, i.price_at_time)).collect::<Vec<_>>().join("; ")
}

/// Natural-language instruction for the AI generation endpoint.
pub fn prompt(template: EmailTemplate, order: &Order, instructions: Option<&str>, business: &BusinessProfile) -> Result<String, EmailError> {
    let customer = order.contact.full_name();
    let org = order.contact.organization.as_deref().map(|o| format!(" of {}", o)).unwrap_or_default();
    let placed = order.created_at.format("%B %-d, %Y");
    let task = match template {
        EmailTemplate::PaymentReminder => format!(
            "Write a friendly, professional payment reminder to {customer}{org} for order #{id}, placed {placed}, with an outstanding total of {total} by {method}. Keep the tone warm and mention they can reply with any questions.",
            id = order.id, total = order.total, method = order.payment_method.label(),
        ),
        EmailTemplate::InstallationConfirmation => {
            let install = order.installation.as_ref().ok_or(EmailError::InstallationNotScheduled(order.id))?;
            format!(
                "Write an installation confirmation to {customer}{org} for order #{id}. Our team will install on {date} at {address}. Ask them to make sure the sanctuary is accessible and power is available at the stage and booth.",
                id = order.id, date = install.preferred_date.format("%A, %B %-d, %Y"), address = install.address.one_line(),
            )
        }
        EmailTemplate::ShippingUpdate => format!(
            "Write a shipping update to {customer}{org} for order #{id}. The equipment is on its way to {address}. Current order status: {status}.",
            id = order.id, address = order.shipping_address.one_line(), status = order.status,
        ),
        EmailTemplate::ThankYou => format!(
            "Write a heartfelt thank-you note to {customer}{org} for choosing {name} for their church audio and video needs (order #{id}).",
            name = business.name, id = order.id,
        ),
        EmailTemplate::Custom => {
            let text = instructions.map(str::trim).filter(|t| !t.is_empty()).ok_or(EmailError::MissingInstructions)?;
            format!("Write an email to {customer}{org} about order #{id}. Instructions: {text}", id = order.id)
        }
    };
    let mut prompt = format!("{task}\n\nOrder items: {items}.\nOrder total: {total}.", items = item_summary(order), total = order.total);
    if template != EmailTemplate::Custom {
        if let Some(extra) = instructions.map(str::trim).filter(|t| !t.is_empty()) {
            prompt.push_str(&format!("\nAdditional notes from staff: {extra}"));
        }
    }
    prompt.push_str(&format!(
        "\nSign off as the {name} team ({phone}, {email}). Return JSON with the keys \"subject\" and \"html\"; the html must be a self-contained email body using inline styles.",
        name = business.name, phone = business.phone, email = business.email,
    ));
    Ok(prompt)
}

/// Deterministic rendering of a template, used for previews and as the no-AI fallback.
pub fn render(template: EmailTemplate, order: &Order, instructions: Option<&str>, business: &BusinessProfile) -> Result<RenderedEmail, EmailError> {
    let greeting = format!("<p>Dear {},</p>", html_escape(&order.contact.full_name()));
    let message = match template {
        EmailTemplate::PaymentReminder => format!(
            "<p>This is a friendly reminder that payment of <strong>{}</strong> for order #{} is still outstanding. Your selected payment method is {}.</p>",
            order.total, order.id, order.payment_method.label(),
        ),
        EmailTemplate::InstallationConfirmation => {
            let install = order.installation.as_ref().ok_or(EmailError::InstallationNotScheduled(order.id))?;
            format!(
                "<p>Your installation is confirmed for <strong>{}</strong> at {}.</p><p>Please make sure the sanctuary is accessible and power is available at the stage and sound booth.</p>",
                install.preferred_date.format("%A, %B %-d, %Y"), html_escape(&install.address.one_line()),
            )
        }
        EmailTemplate::ShippingUpdate => format!(
            "<p>Your equipment for order #{} is on its way to {}. Current status: <strong>{}</strong>.</p>",
            order.id, html_escape(&order.shipping_address.one_line()), order.status,
        ),
        EmailTemplate::ThankYou => format!(
            "<p>Thank you for trusting {} with your ministry's audio and video. It has been a privilege to serve you.</p>",
            html_escape(&business.name),
        ),
        EmailTemplate::Custom => paragraphs(instructions.map(str::trim).filter(|t| !t.is_empty()).ok_or(EmailError::MissingInstructions)?),
    };
    let body = format!("{}\n{}\n{}", greeting, message, items_table(&order_rows(&order.items), &order_totals(order)));
    let subject = template.subject(order, business);
    Ok(RenderedEmail { html: layout(&subject, &body, business), subject })
}

pub fn order_confirmation(order: &Order, business: &BusinessProfile) -> RenderedEmail {
    let subject = if order.is_signed() {
        format!("Your signed contract with {} (order #{})", business.name, order.id)
    } else {
        format!("We received your order #{}", order.id)
    };
    let installation = order.installation.as_ref().map(|i| format!(
        "<p>Installation requested for {} at {}.</p>", i.preferred_date.format("%B %-d, %Y"), html_escape(&i.address.one_line()),
    )).unwrap_or_default();
    let body = format!(
        "<p>Dear {name},</p>\n<p>Thank you for your order. Reference <code>{reference}</code>.</p>\n{table}\n<p>Ship to: {ship}</p>\n{installation}<p>Payment method: {method}</p>",
        name = html_escape(&order.contact.full_name()),
        reference = order.reference,
        table = items_table(&order_rows(&order.items), &order_totals(order)),
        ship = html_escape(&order.shipping_address.one_line()),
        installation = installation,
        method = order.payment_method.label(),
    );
    RenderedEmail { html: layout(&subject, &body, business), subject }
}

/// One priced line of a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
}

pub fn quote_email(customer_name: &str, lines: &[QuoteLine], totals: &PriceBreakdown, message: Option<&str>, business: &BusinessProfile) -> RenderedEmail {
    let subject = format!("Your quote from {}", business.name);
    let rows: Vec<TableRow<'_>> = lines.iter().map(|l| TableRow {
        title: &l.title, quantity: l.quantity, unit: l.unit_price, line: l.unit_price.multiply(l.quantity),
    }).collect();
    let note = message.map(paragraphs).unwrap_or_default();
    let body = format!(
        "<p>Dear {},</p>\n<p>Here is the quote you requested. Prices are valid for 30 days; services and installation are not taxed.</p>\n{}\n{}",
        html_escape(customer_name), items_table(&rows, totals), note,
    );
    RenderedEmail { html: layout(&subject, &body, business), subject }
}

pub fn contact_notification(name: &str, email: &str, phone: Option<&str>, topic: Option<&str>, message: &str, business: &BusinessProfile) -> RenderedEmail {
    let subject = format!("Website inquiry: {}", topic.unwrap_or("General question"));
    let body = format!(
        "<p><strong>From:</strong> {} &lt;{}&gt;</p>\n<p><strong>Phone:</strong> {}</p>\n{}",
        html_escape(name), html_escape(email), html_escape(phone.unwrap_or("not provided")), paragraphs(message),
    );
    RenderedEmail { html: layout(&subject, &body, business), subject }
}

/// Wraps an email body for display in the admin console: an iframe with every sandbox restriction on.
pub fn preview_document(html: &str) -> String {
    format!(
        r#"<iframe title="Email preview" sandbox="" referrerpolicy="no-referrer" style="width: 100%; min-height: 600px; border: 1px solid #e5e7eb;" srcdoc="{}"></iframe>"#,
        html_escape(html),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailError { UnknownTemplate(String), MissingInstructions, InstallationNotScheduled(i64) }
impl std::error::Error for EmailError {}
impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTemplate(id) => write!(f, "Unknown email template: {}", id),
            Self::MissingInstructions => write!(f, "Custom emails need instructions"),
            Self::InstallationNotScheduled(id) => write!(f, "Order {} has no installation scheduled", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::tests::draft;
    use crate::domain::aggregates::{InstallationDetails, Order};
    use chrono::NaiveDate;

    fn order() -> Order {
        let mut order = Order::place(draft()).unwrap();
        order.id = 42;
        order
    }

    #[test]
    fn test_template_ids_round_trip() {
        for t in EmailTemplate::ALL { assert_eq!(t.id().parse::<EmailTemplate>().unwrap(), t); }
        assert_eq!("welcome".parse::<EmailTemplate>(), Err(EmailError::UnknownTemplate("welcome".into())));
    }

    #[test]
    fn test_prompt_interpolates_order() {
        let p = prompt(EmailTemplate::PaymentReminder, &order(), Some("They asked for net-30."), &BusinessProfile::default()).unwrap();
        assert!(p.contains("Ruth Moab of Grace Chapel"));
        assert!(p.contains("order #42"));
        assert!(p.contains("$265.50"));
        assert!(p.contains("net-30"));
        assert!(p.contains("\"subject\""));
    }

    #[test]
    fn test_custom_requires_instructions() {
        let o = order();
        let b = BusinessProfile::default();
        assert_eq!(prompt(EmailTemplate::Custom, &o, None, &b), Err(EmailError::MissingInstructions));
        assert_eq!(render(EmailTemplate::Custom, &o, Some("  "), &b), Err(EmailError::MissingInstructions));
        let rendered = render(EmailTemplate::Custom, &o, Some("Your <b>rack</b> shipped."), &b).unwrap();
        assert!(rendered.html.contains("Your &lt;b&gt;rack&lt;/b&gt; shipped."));
    }

    #[test]
    fn test_installation_template_needs_schedule() {
        let mut o = order();
        let b = BusinessProfile::default();
        assert_eq!(render(EmailTemplate::InstallationConfirmation, &o, None, &b), Err(EmailError::InstallationNotScheduled(42)));
        o.installation = Some(InstallationDetails { address: o.shipping_address.clone(), preferred_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(), notes: None });
        let rendered = render(EmailTemplate::InstallationConfirmation, &o, None, &b).unwrap();
        assert!(rendered.html.contains("Monday, November 2, 2026"));
    }

    #[test]
    fn test_render_escapes_customer_fields() {
        let mut o = order();
        o.contact.first_name = "<script>".into();
        let rendered = render(EmailTemplate::ThankYou, &o, None, &BusinessProfile::default()).unwrap();
        assert!(!rendered.html.contains("<script>"));
        assert!(rendered.html.contains("&lt;script&gt;"));
        assert!(rendered.html.contains("$15.50"));
        assert!(rendered.html.contains("Tax (7.75%)"));
    }

    #[test]
    fn test_confirmation_subject_reflects_signature() {
        let mut o = order();
        assert!(order_confirmation(&o, &BusinessProfile::default()).subject.contains("signed contract"));
        o.signature = None;
        assert_eq!(order_confirmation(&o, &BusinessProfile::default()).subject, "We received your order #42");
    }

    #[test]
    fn test_preview_is_sandboxed() {
        let doc = preview_document("<p class=\"x\">Hi</p>");
        assert!(doc.contains("sandbox=\"\""));
        assert!(doc.contains("&lt;p class=&quot;x&quot;&gt;Hi&lt;/p&gt;"));
    }
}
