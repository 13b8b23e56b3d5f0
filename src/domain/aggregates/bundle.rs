//! Bundle Aggregate
//!
//! The storefront's cart: a mix of physical gear and services, priced through
//! [`crate::domain::pricing`]. Purely local state; nothing is synced to the
//! server until a quote or contract is requested.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::aggregates::Product;
use crate::domain::pricing::{self, PriceBreakdown, PriceLine};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Bundle {
    items: Vec<BundleItem>,
    installation: Money,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleItem {
    pub product: Product,
    pub quantity: u32,
}

impl BundleItem {
    pub fn unit_price(&self) -> Money { self.product.unit_price() }
    pub fn line_total(&self) -> Money { self.unit_price().multiply(self.quantity) }
    pub fn price_line(&self) -> PriceLine { self.product.price_line(self.quantity) }
}

impl Bundle {
    pub fn new() -> Self { Self::default() }

    pub fn items(&self) -> &[BundleItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn unit_count(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn installation(&self) -> Money { self.installation }

    /// Installation can only be booked when some line offers it.
    pub fn installation_available(&self) -> bool { self.items.iter().any(|i| i.product.installation_available) }

    pub fn add_item(&mut self, product: Product, quantity: u32) -> Result<(), BundleError> {
        if quantity == 0 { return Err(BundleError::ZeroQuantity); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.items.push(BundleItem { product, quantity });
        }
        self.touch();
        Ok(())
    }

    pub fn update_quantity(&mut self, product_id: i64, quantity: u32) -> Result<(), BundleError> {
        let item = self.items.iter_mut().find(|i| i.product.id == product_id).ok_or(BundleError::ItemNotFound(product_id))?;
        if quantity == 0 { return self.remove_item(product_id); }
        item.quantity = quantity;
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: i64) -> Result<(), BundleError> {
        let before = self.items.len();
        self.items.retain(|i| i.product.id != product_id);
        if self.items.len() == before { return Err(BundleError::ItemNotFound(product_id)); }
        if !self.installation_available() { self.installation = Money::zero(); }
        self.touch();
        Ok(())
    }

    pub fn set_installation(&mut self, fee: Money) -> Result<(), BundleError> {
        if !fee.is_zero() && !self.installation_available() { return Err(BundleError::InstallationUnavailable); }
        self.installation = fee;
        self.touch();
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); self.installation = Money::zero(); self.touch(); }

    pub fn price_lines(&self) -> Vec<PriceLine> { self.items.iter().map(BundleItem::price_line).collect() }

    pub fn pricing(&self) -> PriceBreakdown { pricing::compute_totals(&self.price_lines(), self.installation) }

    pub fn estimated_profit(&self) -> Money { pricing::compute_profit(&self.price_lines(), self.installation) }

    fn touch(&mut self) { self.updated_at = Some(Utc::now()); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleError { ItemNotFound(i64), ZeroQuantity, InstallationUnavailable }
impl std::error::Error for BundleError {}
impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ItemNotFound(id) => write!(f, "Product {} is not in the bundle", id),
            Self::ZeroQuantity => write!(f, "Quantity must be at least 1"),
            Self::InstallationUnavailable => write!(f, "None of the selected items can be installed"),
        }
    }
}
