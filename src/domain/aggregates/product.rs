//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

use crate::domain::pricing::PriceLine;
use crate::domain::value_objects::{Category, Money, CUSTOM_SERVICE_CATEGORY};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub our_price: Option<Money>,
    /// Internal unit cost; stripped from public catalog responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Money>,
    pub category: Category,
    #[serde(default)]
    pub is_service: bool,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub technical_details: BTreeMap<String, String>,
    pub image_url: Option<String>,
    pub warranty: Option<String>,
    #[serde(default)]
    pub installation_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The admin-editable part of a product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProductDraft {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "valid_amount")]
    pub price: Money,
    #[validate(custom = "valid_amount")]
    #[serde(default)]
    pub our_price: Option<Money>,
    #[validate(custom = "valid_amount")]
    #[serde(default)]
    pub cost: Option<Money>,
    #[validate(custom = "category_present")]
    pub category: Category,
    #[serde(default)]
    pub is_service: bool,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub technical_details: BTreeMap<String, String>,
    #[validate(url)]
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub warranty: Option<String>,
    #[serde(default)]
    pub installation_available: bool,
}

/// Non-negative and cent-exact; prices are stored as NUMERIC(12,2).
fn valid_amount(value: &Money) -> Result<(), ValidationError> {
    if value.is_negative() { return Err(ValidationError::new("negative_price")); }
    if *value != value.round_cents() { return Err(ValidationError::new("sub_cent_price")); }
    Ok(())
}

fn category_present(value: &Category) -> Result<(), ValidationError> {
    if value.as_str().is_empty() { return Err(ValidationError::new("category_required")); }
    Ok(())
}

impl ProductDraft {
    /// Ad hoc service line quoted for one customer. Always tax-exempt.
    pub fn custom_service(title: impl Into<String>, description: impl Into<String>, price: Money) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            price,
            category: Category::new(CUSTOM_SERVICE_CATEGORY),
            is_service: true,
            is_custom: true,
            ..Default::default()
        }
    }

    /// Normalizes whitespace and keeps the service flags consistent with the category.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.category = Category::new(self.category.as_str());
        self.features.retain(|f| !f.trim().is_empty());
        if self.is_custom { self.is_service = true; }
        self
    }
}

impl Product {
    pub fn from_draft(id: i64, draft: ProductDraft) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: draft.title,
            description: draft.description,
            price: draft.price,
            our_price: draft.our_price,
            cost: draft.cost,
            category: draft.category,
            is_service: draft.is_service,
            is_custom: draft.is_custom,
            features: draft.features,
            technical_details: draft.technical_details,
            image_url: draft.image_url,
            warranty: draft.warranty,
            installation_available: draft.installation_available,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: ProductDraft) {
        let id = self.id;
        let created_at = self.created_at;
        *self = Product::from_draft(id, draft);
        self.created_at = created_at;
    }

    /// Price the customer pays: the override when set, otherwise list price.
    pub fn unit_price(&self) -> Money { self.our_price.unwrap_or(self.price) }

    pub fn is_tax_exempt(&self) -> bool { self.is_service || self.is_custom || self.category.is_services() }

    pub fn is_taxable(&self) -> bool { !self.is_tax_exempt() }

    pub fn price_line(&self, quantity: u32) -> PriceLine {
        PriceLine::new(self.unit_price(), quantity, self.is_taxable()).with_cost(self.cost)
    }

    /// Copy safe to hand to anonymous visitors.
    pub fn public_view(&self) -> Product {
        Product { cost: None, ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn draft(category: &str) -> ProductDraft {
        ProductDraft { title: "Shure SM58".into(), price: Money::dollars(100), category: Category::new(category), ..Default::default() }
    }

    #[test]
    fn test_tax_treatment_follows_category() {
        assert!(Product::from_draft(1, draft("Audio Gear/Mics")).is_taxable());
        assert!(Product::from_draft(2, draft("Services")).is_tax_exempt());
        assert!(Product::from_draft(3, draft("Services/Custom")).is_tax_exempt());
        let mut flagged = draft("Audio Gear");
        flagged.is_service = true;
        assert!(Product::from_draft(4, flagged).is_tax_exempt());
    }

    #[test]
    fn test_unit_price_prefers_our_price() {
        let mut d = draft("Audio Gear/Mics");
        d.our_price = Some(Money::dollars(89));
        let p = Product::from_draft(1, d);
        assert_eq!(p.unit_price(), Money::dollars(89));
        assert_eq!(p.price_line(2).line_total(), Money::dollars(178));
    }

    #[test]
    fn test_custom_service_is_exempt() {
        let d = ProductDraft::custom_service("Sanctuary tuning", "Ring-out and EQ", Money::dollars(450));
        let p = Product::from_draft(9, d);
        assert!(p.is_custom && p.is_service);
        assert_eq!(p.category.as_str(), "Services/Custom");
        assert!(p.is_tax_exempt());
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft("Audio Gear").validate().is_ok());
        let mut bad = draft("Audio Gear");
        bad.title.clear();
        bad.price = Money::dollars(-1);
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("price"));
        assert!(draft("").validate().unwrap_err().field_errors().contains_key("category"));
    }

    #[test]
    fn test_sub_cent_amounts_rejected() {
        let mut d = draft("Audio Gear");
        d.price = Money::new(Decimal::new(19999, 3));
        d.cost = Some(Money::new(Decimal::new(10001, 3)));
        let errors = d.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));
        assert!(errors.field_errors().contains_key("cost"));

        d.price = Money::new(Decimal::new(19990, 3));
        d.cost = None;
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_public_view_hides_cost() {
        let mut d = draft("Audio Gear");
        d.cost = Some(Money::dollars(60));
        let p = Product::from_draft(1, d);
        assert_eq!(p.public_view().cost, None);
        let json = serde_json::to_value(p.public_view()).unwrap();
        assert!(json.get("cost").is_none());
    }

    #[test]
    fn test_apply_keeps_identity() {
        let mut p = Product::from_draft(7, draft("Audio Gear"));
        let created = p.created_at;
        p.apply(draft("Video/Cameras"));
        assert_eq!(p.id, 7);
        assert_eq!(p.created_at, created);
        assert_eq!(p.category.as_str(), "Video/Cameras");
    }
}
