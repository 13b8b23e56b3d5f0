//! Checkout wizard state machine.
//!
//! `Contact → Shipping → Payment → [Installation] → Review`. The installation
//! step only exists when the bundle carries an installation fee. Forward moves
//! go through [`CheckoutWizard::next`], which runs the active step's
//! validator; backward moves may only land on steps already completed.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::aggregates::order::validate_signature;
use crate::domain::aggregates::{Address, Bundle, ContactInfo, InstallationDetails, PaymentMethod};
use crate::domain::value_objects::Money;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(?([0-9]{3})\)?[-. ]?([0-9]{3})[-. ]?([0-9]{4})$").expect("phone regex"));
static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("zip regex"));

pub fn is_valid_email(value: &str) -> bool { EMAIL_RE.is_match(value.trim()) }
pub fn is_valid_us_phone(value: &str) -> bool { PHONE_RE.is_match(value.trim()) }
pub fn is_valid_zip(value: &str) -> bool { ZIP_RE.is_match(value.trim()) }

/// Field name to message. Empty means the step may advance.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep { Contact, Shipping, Payment, Installation, Review }

impl CheckoutStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Shipping => "shipping",
            Self::Payment => "payment",
            Self::Installation => "installation",
            Self::Review => "review",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Contact => "Contact Information",
            Self::Shipping => "Shipping Address",
            Self::Payment => "Payment Method",
            Self::Installation => "Installation Details",
            Self::Review => "Review & Sign",
        }
    }
}

/// Every input the wizard collects, flat as the form posts it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub organization: String,
    pub email: String,
    pub phone: String,

    pub street: String,
    pub street2: String,
    pub city: String,
    pub state: String,
    pub zip: String,

    pub payment_method: Option<PaymentMethod>,
    pub po_number: String,

    pub installation_same_as_shipping: bool,
    pub installation_street: String,
    pub installation_city: String,
    pub installation_state: String,
    pub installation_zip: String,
    pub installation_date: String,
    pub installation_notes: String,

    pub notes: String,
    pub signature: Option<String>,
}

fn require(errors: &mut FieldErrors, field: &str, value: &str, label: &str) -> bool {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), format!("{} is required", label));
        return false;
    }
    true
}

fn non_empty(value: &str) -> Option<String> {
    let v = value.trim();
    if v.is_empty() { None } else { Some(v.to_string()) }
}

impl CheckoutForm {
    pub fn validate_step(&self, step: CheckoutStep) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            CheckoutStep::Contact => {
                require(&mut errors, "first_name", &self.first_name, "First name");
                require(&mut errors, "last_name", &self.last_name, "Last name");
                if require(&mut errors, "email", &self.email, "Email") && !is_valid_email(&self.email) {
                    errors.insert("email".into(), "Enter a valid email address".into());
                }
                if require(&mut errors, "phone", &self.phone, "Phone") && !is_valid_us_phone(&self.phone) {
                    errors.insert("phone".into(), "Enter a valid US phone number".into());
                }
            }
            CheckoutStep::Shipping => {
                require(&mut errors, "street", &self.street, "Street address");
                require(&mut errors, "city", &self.city, "City");
                require(&mut errors, "state", &self.state, "State");
                if require(&mut errors, "zip", &self.zip, "ZIP code") && !is_valid_zip(&self.zip) {
                    errors.insert("zip".into(), "Enter a 5 or 9 digit ZIP code".into());
                }
            }
            CheckoutStep::Payment => match self.payment_method {
                None => { errors.insert("payment_method".into(), "Choose a payment method".into()); }
                Some(PaymentMethod::PurchaseOrder) => { require(&mut errors, "po_number", &self.po_number, "PO number"); }
                Some(_) => {}
            },
            CheckoutStep::Installation => {
                if !self.installation_same_as_shipping {
                    require(&mut errors, "installation_street", &self.installation_street, "Installation street");
                    require(&mut errors, "installation_city", &self.installation_city, "Installation city");
                    require(&mut errors, "installation_state", &self.installation_state, "Installation state");
                    if require(&mut errors, "installation_zip", &self.installation_zip, "Installation ZIP code") && !is_valid_zip(&self.installation_zip) {
                        errors.insert("installation_zip".into(), "Enter a 5 or 9 digit ZIP code".into());
                    }
                }
                if require(&mut errors, "installation_date", &self.installation_date, "Preferred installation date") && self.preferred_date().is_none() {
                    errors.insert("installation_date".into(), "Use the YYYY-MM-DD format".into());
                }
            }
            CheckoutStep::Review => match self.signature.as_deref() {
                None => { errors.insert("signature".into(), "Please sign the contract".into()); }
                Some(sig) => if let Err(e) = validate_signature(sig) { errors.insert("signature".into(), e.to_string()); },
            },
        }
        errors
    }

    /// All steps at once; what the server runs on a submitted contract.
    pub fn validate_all(&self, with_installation: bool) -> FieldErrors {
        steps_for(with_installation).into_iter().flat_map(|s| self.validate_step(s)).collect()
    }

    pub fn contact(&self) -> ContactInfo {
        ContactInfo {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            organization: non_empty(&self.organization),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }

    pub fn shipping_address(&self) -> Address {
        Address {
            street: self.street.trim().to_string(),
            street2: non_empty(&self.street2),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            zip: self.zip.trim().to_string(),
        }
    }

    pub fn preferred_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.installation_date.trim(), "%Y-%m-%d").ok()
    }

    pub fn installation_details(&self) -> Option<InstallationDetails> {
        let preferred_date = self.preferred_date()?;
        let address = if self.installation_same_as_shipping {
            self.shipping_address()
        } else {
            Address {
                street: self.installation_street.trim().to_string(),
                street2: None,
                city: self.installation_city.trim().to_string(),
                state: self.installation_state.trim().to_string(),
                zip: self.installation_zip.trim().to_string(),
            }
        };
        Some(InstallationDetails { address, preferred_date, notes: non_empty(&self.installation_notes) })
    }
}

pub fn steps_for(with_installation: bool) -> Vec<CheckoutStep> {
    let mut steps = vec![CheckoutStep::Contact, CheckoutStep::Shipping, CheckoutStep::Payment];
    if with_installation { steps.push(CheckoutStep::Installation); }
    steps.push(CheckoutStep::Review);
    steps
}

/// A bundle line as the contract endpoint receives it. Prices are looked up server-side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: i64,
    pub quantity: u32,
}

/// Figures the browser showed the customer; logged against the server's own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotedTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub installation: Money,
    pub total: Money,
    pub profit: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractRequest {
    pub form: CheckoutForm,
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub include_installation: bool,
    #[serde(default)]
    pub quoted: Option<QuotedTotals>,
}

#[derive(Debug, Clone)]
pub struct CheckoutWizard {
    step: CheckoutStep,
    completed: Vec<CheckoutStep>,
    installation_price: Money,
    form: CheckoutForm,
    errors: FieldErrors,
    open: bool,
    submitting: bool,
}

impl CheckoutWizard {
    pub fn new(installation_price: Money) -> Self {
        Self {
            step: CheckoutStep::Contact, completed: Vec::new(), installation_price,
            form: CheckoutForm::default(), errors: FieldErrors::new(), open: true, submitting: false,
        }
    }

    pub fn for_bundle(bundle: &Bundle) -> Self { Self::new(bundle.installation()) }

    pub fn step(&self) -> CheckoutStep { self.step }
    pub fn form(&self) -> &CheckoutForm { &self.form }
    pub fn form_mut(&mut self) -> &mut CheckoutForm { &mut self.form }
    pub fn errors(&self) -> &FieldErrors { &self.errors }
    pub fn is_open(&self) -> bool { self.open }
    pub fn is_submitting(&self) -> bool { self.submitting }
    pub fn installation_price(&self) -> Money { self.installation_price }
    pub fn has_installation(&self) -> bool { self.installation_price > Money::zero() }
    pub fn steps(&self) -> Vec<CheckoutStep> { steps_for(self.has_installation()) }
    pub fn is_completed(&self, step: CheckoutStep) -> bool { self.completed.contains(&step) }

    fn index_of(&self, step: CheckoutStep) -> Option<usize> { self.steps().iter().position(|s| *s == step) }

    /// Validates the active step and, if clean, moves to the following one.
    pub fn next(&mut self) -> Result<CheckoutStep, WizardError> {
        let steps = self.steps();
        let idx = self.index_of(self.step).unwrap_or(0);
        let Some(&following) = steps.get(idx + 1) else { return Err(WizardError::NoNextStep); };
        let errors = self.form.validate_step(self.step);
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(WizardError::Invalid(errors));
        }
        self.errors.clear();
        if !self.completed.contains(&self.step) { self.completed.push(self.step); }
        self.step = following;
        Ok(following)
    }

    /// Steps back to the nearest completed step; unvisited steps are skipped.
    pub fn back(&mut self) -> Result<CheckoutStep, WizardError> {
        let idx = self.index_of(self.step).unwrap_or(0);
        let previous = self.steps()[..idx].iter().rev().copied().find(|s| self.completed.contains(s));
        let Some(previous) = previous else { return Err(WizardError::NoPreviousStep); };
        self.step = previous;
        self.errors.clear();
        Ok(previous)
    }

    /// Step-indicator click. Only completed steps before the current one are reachable.
    pub fn go_to(&mut self, step: CheckoutStep) -> Result<(), WizardError> {
        let locked = || WizardError::StepLocked { from: self.step, to: step };
        let target = self.index_of(step).ok_or_else(locked)?;
        let current = self.index_of(self.step).unwrap_or(0);
        if target >= current || !self.completed.contains(&step) { return Err(locked()); }
        self.step = step;
        self.errors.clear();
        Ok(())
    }

    /// Re-prices installation; dropping it mid-flow removes the step.
    pub fn set_installation_price(&mut self, price: Money) {
        self.installation_price = price;
        if !self.has_installation() {
            self.completed.retain(|s| *s != CheckoutStep::Installation);
            if self.step == CheckoutStep::Installation { self.step = CheckoutStep::Payment; }
        }
    }

    pub fn sign(&mut self, data_url: impl Into<String>) { self.form.signature = Some(data_url.into()); }
    pub fn clear_signature(&mut self) { self.form.signature = None; }

    /// The final submit button's enabled state.
    pub fn can_submit(&self) -> bool {
        self.open && !self.submitting && self.step == CheckoutStep::Review && self.form.signature.is_some()
            && self.form.validate_all(self.has_installation()).is_empty()
    }

    /// Builds the contract payload and marks the wizard busy until [`Self::finish`].
    pub fn begin_submit(&mut self, bundle: &Bundle) -> Result<ContractRequest, WizardError> {
        if self.submitting { return Err(WizardError::AlreadySubmitting); }
        if self.step != CheckoutStep::Review { return Err(WizardError::NotOnReview); }
        // Installation follows the bundle.
        if bundle.installation() != self.installation_price { self.set_installation_price(bundle.installation()); }
        let errors = self.form.validate_all(self.has_installation());
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(WizardError::Invalid(errors));
        }
        let pricing = bundle.pricing();
        let quoted = QuotedTotals {
            subtotal: pricing.subtotal,
            tax: pricing.tax,
            installation: self.installation_price,
            total: pricing.subtotal + pricing.tax + self.installation_price,
            profit: bundle.estimated_profit(),
        };
        self.submitting = true;
        Ok(ContractRequest {
            form: self.form.clone(),
            items: bundle.items().iter().map(|i| LineRequest { product_id: i.product.id, quantity: i.quantity }).collect(),
            include_installation: self.has_installation(),
            quoted: Some(quoted),
        })
    }

    /// Ends a submission. Success closes the wizard; failure leaves it open on Review.
    pub fn finish(&mut self, succeeded: bool) {
        self.submitting = false;
        if succeeded { self.open = false; }
    }

    pub fn close(&mut self) { self.open = false; }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    Invalid(FieldErrors),
    NoNextStep,
    NoPreviousStep,
    StepLocked { from: CheckoutStep, to: CheckoutStep },
    NotOnReview,
    AlreadySubmitting,
}
impl std::error::Error for WizardError {}
impl fmt::Display for WizardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(errors) => write!(f, "Please fix: {}", errors.keys().cloned().collect::<Vec<_>>().join(", ")),
            Self::NoNextStep => write!(f, "Already on the last step"),
            Self::NoPreviousStep => write!(f, "Already on the first step"),
            Self::StepLocked { from, to } => write!(f, "Cannot jump from {} to {}", from.as_str(), to.as_str()),
            Self::NotOnReview => write!(f, "Review the order before submitting"),
            Self::AlreadySubmitting => write!(f, "Submission already in progress"),
        }
    }
}
