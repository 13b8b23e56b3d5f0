//! Bundle plus checkout wizard as the storefront drives them.

use crate::client::{Api, Toast, Transport};
use crate::domain::aggregates::{Bundle, BundleError, Order, Product};
use crate::domain::checkout::{CheckoutWizard, LineRequest, WizardError};
use crate::domain::pricing::PriceBreakdown;
use crate::domain::value_objects::Money;

pub struct CheckoutSession<T> {
    api: Api<T>,
    bundle: Bundle,
    wizard: Option<CheckoutWizard>,
    toasts: Vec<Toast>,
    installation_fee: Money,
}

impl<T: Transport> CheckoutSession<T> {
    pub fn new(api: Api<T>, installation_fee: Money) -> Self {
        Self { api, bundle: Bundle::new(), wizard: None, toasts: Vec::new(), installation_fee }
    }

    pub fn api(&self) -> &Api<T> { &self.api }
    pub fn bundle(&self) -> &Bundle { &self.bundle }
    pub fn wizard(&self) -> Option<&CheckoutWizard> { self.wizard.as_ref() }
    pub fn wizard_mut(&mut self) -> Option<&mut CheckoutWizard> { self.wizard.as_mut() }
    pub fn toasts(&self) -> &[Toast] { &self.toasts }

    pub fn add(&mut self, product: Product, quantity: u32) -> Result<(), BundleError> { self.bundle.add_item(product, quantity) }

    /// Quantity 0 removes the line. Losing the last installable line drops installation.
    pub fn update_quantity(&mut self, product_id: i64, quantity: u32) -> Result<(), BundleError> {
        self.bundle.update_quantity(product_id, quantity)?;
        self.sync_wizard();
        Ok(())
    }

    pub fn remove(&mut self, product_id: i64) -> Result<(), BundleError> {
        self.bundle.remove_item(product_id)?;
        self.sync_wizard();
        Ok(())
    }

    fn sync_wizard(&mut self) {
        let fee = self.bundle.installation();
        if let Some(w) = self.wizard.as_mut() { w.set_installation_price(fee); }
    }

    /// Toggles the flat installation fee; the wizard gains or loses its installation step.
    pub fn set_installation(&mut self, wanted: bool) -> Result<(), BundleError> {
        let fee = if wanted { self.installation_fee } else { Money::zero() };
        self.bundle.set_installation(fee)?;
        self.sync_wizard();
        Ok(())
    }

    pub fn totals(&self) -> PriceBreakdown { self.bundle.pricing() }

    /// "Create contract": opens the wizard over the current bundle.
    pub fn open_checkout(&mut self) -> bool {
        if self.bundle.is_empty() {
            self.toasts.push(Toast::error("Add something to your bundle first"));
            return false;
        }
        self.wizard = Some(CheckoutWizard::for_bundle(&self.bundle));
        true
    }

    /// Final submit. Success clears the bundle and closes the wizard; failure
    /// leaves both in place with an error toast.
    pub async fn submit_contract(&mut self) -> Option<Order> {
        let wizard = self.wizard.as_mut()?;
        let request = match wizard.begin_submit(&self.bundle) {
            Ok(req) => req,
            Err(WizardError::AlreadySubmitting) => return None,
            Err(e) => { self.toasts.push(Toast::error(e.to_string())); return None; }
        };
        let result = self.api.submit_contract(&request).await;
        let succeeded = result.is_ok();
        if let Some(w) = self.wizard.as_mut() { w.finish(succeeded); }
        match result {
            Ok(order) => {
                self.bundle.clear();
                self.wizard = None;
                self.toasts.push(Toast::success(format!("Contract #{} submitted. Check your email for a copy.", order.id)));
                Some(order)
            }
            Err(e) => {
                self.toasts.push(Toast::error(format!("Failed to submit contract: {}", e)));
                None
            }
        }
    }

    pub async fn email_quote(&mut self, name: &str, email: &str) -> Option<PriceBreakdown> {
        let items: Vec<LineRequest> = self.bundle.items().iter()
            .map(|i| LineRequest { product_id: i.product.id, quantity: i.quantity })
            .collect();
        let with_installation = !self.bundle.installation().is_zero();
        match self.api.generate_quote(name, email, &items, with_installation).await {
            Ok(totals) => { self.toasts.push(Toast::success(format!("Quote sent to {}", email))); Some(totals) }
            Err(e) => { self.toasts.push(Toast::error(format!("Failed to send quote: {}", e))); None }
        }
    }
}
