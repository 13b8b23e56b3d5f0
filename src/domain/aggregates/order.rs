//! Order Aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::pricing::{self, PriceLine};
use crate::domain::value_objects::{Category, Money};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub reference: Uuid,
    pub contact: ContactInfo,
    pub shipping_address: Address,
    pub installation: Option<InstallationDetails>,
    pub payment_method: PaymentMethod,
    pub po_number: Option<String>,
    /// PNG data URL captured by the signature pad. `None` for unsigned orders.
    pub signature: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub installation_price: Money,
    pub total: Money,
    pub cost: Money,
    pub profit: Money,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub organization: Option<String>,
    pub email: String,
    pub phone: String,
}

impl ContactInfo {
    pub fn full_name(&self) -> String { format!("{} {}", self.first_name, self.last_name).trim().to_string() }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub street2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl Address {
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.street.clone()];
        if let Some(ref s2) = self.street2 { if !s2.is_empty() { parts.push(s2.clone()); } }
        parts.push(self.city.clone());
        parts.push(format!("{} {}", self.state, self.zip));
        parts.join(", ")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationDetails {
    pub address: Address,
    pub preferred_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { #[default] CreditCard, Check, BankTransfer, PurchaseOrder }

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::Check => "check",
            Self::BankTransfer => "bank_transfer",
            Self::PurchaseOrder => "purchase_order",
        }
    }
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreditCard => "Credit card",
            Self::Check => "Check",
            Self::BankTransfer => "Bank transfer",
            Self::PurchaseOrder => "Purchase order",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_card" => Ok(Self::CreditCard),
            "check" => Ok(Self::Check),
            "bank_transfer" => Ok(Self::BankTransfer),
            "purchase_order" => Ok(Self::PurchaseOrder),
            other => Err(OrderError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

/// Admin-managed status. Any status may be set from any other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Confirmed, Completed, Cancelled, Delayed }

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [Self::Pending, Self::Confirmed, Self::Completed, Self::Cancelled, Self::Delayed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Delayed => "delayed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Option<i64>,
    pub title: String,
    pub category: Category,
    pub quantity: u32,
    pub price_at_time: Money,
    pub cost_at_time: Option<Money>,
    pub taxable: bool,
}

impl OrderItem {
    pub fn line_total(&self) -> Money { self.price_at_time.multiply(self.quantity) }
    pub fn price_line(&self) -> PriceLine {
        PriceLine::new(self.price_at_time, self.quantity, self.taxable).with_cost(self.cost_at_time)
    }
}

/// Everything needed to place an order, already checked by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderDraft {
    pub contact: ContactInfo,
    pub shipping_address: Address,
    pub installation: Option<InstallationDetails>,
    pub installation_price: Money,
    pub payment_method: PaymentMethod,
    pub po_number: Option<String>,
    pub signature: Option<String>,
    pub items: Vec<OrderItem>,
    pub notes: Option<String>,
}

impl Order {
    /// Builds a pending order; totals are derived here, never taken from the caller.
    pub fn place(draft: OrderDraft) -> Result<Self, OrderError> {
        if draft.items.is_empty() { return Err(OrderError::NoItems); }
        if draft.items.iter().any(|i| i.quantity == 0) { return Err(OrderError::ZeroQuantity); }
        if let Some(ref sig) = draft.signature { validate_signature(sig)?; }
        let installation_price = if draft.installation.is_some() { draft.installation_price } else { Money::zero() };
        let now = Utc::now();
        let mut order = Self {
            id: 0, reference: Uuid::now_v7(), contact: draft.contact, shipping_address: draft.shipping_address,
            installation: draft.installation, payment_method: draft.payment_method, po_number: draft.po_number,
            signature: draft.signature, status: OrderStatus::Pending, items: draft.items,
            subtotal: Money::zero(), tax: Money::zero(), installation_price, total: Money::zero(),
            cost: Money::zero(), profit: Money::zero(), notes: draft.notes, created_at: now, updated_at: now,
        };
        order.recalculate();
        Ok(order)
    }

    pub fn is_signed(&self) -> bool { self.signature.is_some() }

    pub fn price_lines(&self) -> Vec<PriceLine> { self.items.iter().map(OrderItem::price_line).collect() }

    /// Returns the previous status.
    pub fn set_status(&mut self, status: OrderStatus) -> OrderStatus {
        let previous = std::mem::replace(&mut self.status, status);
        self.touch();
        previous
    }

    pub fn recalculate(&mut self) {
        let lines = self.price_lines();
        let totals = pricing::compute_totals(&lines, self.installation_price);
        self.subtotal = totals.subtotal;
        self.tax = totals.tax;
        self.total = totals.total;
        // Stored at cent precision, so profit is derived from the rounded cost.
        self.cost = pricing::compute_cost(&lines).round_cents();
        self.profit = self.subtotal + self.installation_price - self.cost;
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

pub fn validate_signature(signature: &str) -> Result<(), OrderError> {
    if signature.trim().is_empty() { return Err(OrderError::MissingSignature); }
    if !signature.starts_with("data:image/") || !signature.contains(";base64,") { return Err(OrderError::InvalidSignature); }
    Ok(())
}

/// Admin dashboard figures. Cancelled orders are counted but excluded from money totals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderStats {
    pub order_count: usize,
    pub revenue: Money,
    pub tax: Money,
    pub installation: Money,
    pub cost: Money,
    pub profit: Money,
    pub by_status: BTreeMap<OrderStatus, usize>,
}

impl OrderStats {
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut stats = OrderStats::default();
        for order in orders {
            stats.order_count += 1;
            *stats.by_status.entry(order.status).or_insert(0) += 1;
            if order.status == OrderStatus::Cancelled { continue; }
            stats.revenue = stats.revenue + order.total;
            stats.tax = stats.tax + order.tax;
            stats.installation = stats.installation + order.installation_price;
            stats.cost = stats.cost + order.cost;
            stats.profit = stats.profit + order.profit;
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError { NoItems, ZeroQuantity, MissingSignature, InvalidSignature, UnknownStatus(String), UnknownPaymentMethod(String) }
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoItems => write!(f, "Order has no items"),
            Self::ZeroQuantity => write!(f, "Item quantity must be at least 1"),
            Self::MissingSignature => write!(f, "Signature is required"),
            Self::InvalidSignature => write!(f, "Signature must be an image data URL"),
            Self::UnknownStatus(s) => write!(f, "Unknown order status: {}", s),
            Self::UnknownPaymentMethod(s) => write!(f, "Unknown payment method: {}", s),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SIGNATURE: &str = "data:image/png;base64,iVBORw0KGgo=";

    pub(crate) fn item(title: &str, price: i64, qty: u32, taxable: bool) -> OrderItem {
        OrderItem {
            product_id: Some(1), title: title.into(),
            category: Category::new(if taxable { "Audio Gear" } else { "Services" }),
            quantity: qty, price_at_time: Money::dollars(price), cost_at_time: None, taxable,
        }
    }

    pub(crate) fn draft() -> OrderDraft {
        OrderDraft {
            contact: ContactInfo { first_name: "Ruth".into(), last_name: "Moab".into(), organization: Some("Grace Chapel".into()), email: "ruth@grace.org".into(), phone: "555-123-4567".into() },
            shipping_address: Address { street: "1 Church St".into(), street2: None, city: "Fresno".into(), state: "CA".into(), zip: "93701".into() },
            installation: None,
            installation_price: Money::zero(),
            payment_method: PaymentMethod::Check,
            po_number: None,
            signature: Some(SIGNATURE.into()),
            items: vec![item("SM58", 100, 2, true), item("Tuning", 50, 1, false)],
            notes: None,
        }
    }

    #[test]
    fn test_place_derives_totals() {
        let order = Order::place(draft()).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, Money::dollars(250));
        assert_eq!(order.tax, Money::from_cents(1550));
        assert_eq!(order.total, Money::from_cents(26550));
        assert_eq!(order.profit, Money::dollars(90));
    }

    #[test]
    fn test_installation_price_requires_details() {
        let mut d = draft();
        d.installation_price = Money::dollars(500);
        assert_eq!(Order::place(d.clone()).unwrap().installation_price, Money::zero());
        d.installation = Some(InstallationDetails {
            address: d.shipping_address.clone(),
            preferred_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            notes: None,
        });
        let order = Order::place(d).unwrap();
        assert_eq!(order.installation_price, Money::dollars(500));
        assert_eq!(order.total, Money::from_cents(76550));
        assert_eq!(order.profit, Money::dollars(590));
    }

    #[test]
    fn test_place_rejects_bad_input() {
        let mut d = draft();
        d.items.clear();
        assert_eq!(Order::place(d).unwrap_err(), OrderError::NoItems);
        let mut d = draft();
        d.signature = Some("not-an-image".into());
        assert_eq!(Order::place(d).unwrap_err(), OrderError::InvalidSignature);
    }

    #[test]
    fn test_status_any_to_any() {
        let mut order = Order::place(draft()).unwrap();
        for status in OrderStatus::ALL {
            let before = order.status;
            assert_eq!(order.set_status(status), before);
            assert_eq!(order.status, status);
        }
        assert_eq!("delayed".parse::<OrderStatus>().unwrap(), OrderStatus::Delayed);
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert_eq!(serde_json::to_string(&OrderStatus::Cancelled).unwrap(), "\"cancelled\"");
    }

    #[test]
    fn test_stats_skip_cancelled_money() {
        let a = Order::place(draft()).unwrap();
        let mut b = Order::place(draft()).unwrap();
        b.set_status(OrderStatus::Cancelled);
        let stats = OrderStats::from_orders([&a, &b]);
        assert_eq!(stats.order_count, 2);
        assert_eq!(stats.revenue, Money::from_cents(26550));
        assert_eq!(stats.tax, Money::from_cents(1550));
        assert_eq!(stats.by_status.get(&OrderStatus::Cancelled), Some(&1));
        assert_eq!(stats.by_status.get(&OrderStatus::Pending), Some(&1));
    }
}
