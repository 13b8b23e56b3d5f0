//! Tax, totals and margin rules shared by bundles, contracts and admin reporting.
//!
//! Every figure the storefront shows is derived here. Handlers and client
//! controllers never multiply by the tax rate themselves.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Money;

/// Sales tax applied to physical goods (7.75%).
pub const TAX_RATE: Decimal = Decimal::from_parts(775, 0, 0, false, 4);

/// Margin assumed on physical goods whose unit cost is not tracked (20%).
pub const ASSUMED_PRODUCT_MARGIN: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// One priced line, independent of where it came from (bundle, order, quote).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceLine {
    pub unit_price: Money,
    pub quantity: u32,
    pub taxable: bool,
    pub unit_cost: Option<Money>,
}

impl PriceLine {
    pub fn new(unit_price: Money, quantity: u32, taxable: bool) -> Self {
        Self { unit_price, quantity, taxable, unit_cost: None }
    }
    pub fn with_cost(mut self, unit_cost: Option<Money>) -> Self { self.unit_cost = unit_cost; self }
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }

    /// Services (untaxed lines) carry no cost; goods use tracked cost or the assumed margin.
    pub fn cost(&self) -> Money {
        if !self.taxable { return Money::zero(); }
        match self.unit_cost {
            Some(cost) => cost.multiply(self.quantity),
            None => self.line_total() - self.line_total().scale(ASSUMED_PRODUCT_MARGIN),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub taxable_subtotal: Money,
    pub tax: Money,
    pub installation: Money,
    pub total: Money,
}

pub fn subtotal(lines: &[PriceLine]) -> Money {
    lines.iter().map(PriceLine::line_total).sum()
}

pub fn taxable_subtotal(lines: &[PriceLine]) -> Money {
    lines.iter().filter(|l| l.taxable).map(PriceLine::line_total).sum()
}

/// Tax on taxable lines only, rounded to the cent. Installation is never taxed.
pub fn compute_tax(lines: &[PriceLine]) -> Money {
    taxable_subtotal(lines).scale(TAX_RATE).round_cents()
}

pub fn compute_totals(lines: &[PriceLine], installation: Money) -> PriceBreakdown {
    let subtotal = subtotal(lines);
    let taxable_subtotal = taxable_subtotal(lines);
    let tax = compute_tax(lines);
    PriceBreakdown { subtotal, taxable_subtotal, tax, installation, total: subtotal + tax + installation }
}

pub fn compute_cost(lines: &[PriceLine]) -> Money {
    lines.iter().map(PriceLine::cost).sum()
}

/// Services and installation are pure margin; tax is pass-through and excluded.
pub fn compute_profit(lines: &[PriceLine], installation: Money) -> Money {
    subtotal(lines) + installation - compute_cost(lines)
}
