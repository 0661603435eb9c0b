//! Checkout wizard.
//!
//! A linear three-step flow with a terminal "placed" state:
//!
//! 1. **Product details**: quantity only, no gate on continuing.
//! 2. **Customer info**: all five fields must be present to continue.
//! 3. **Payment**: a method must be chosen, plus a transaction reference
//!    unless paying on delivery.
//!
//! Each step owns its own draft. Drafts are validated when leaving the step,
//! and the validated value travels with the next stage, so [`Stage::Payment`]
//! always carries complete customer details and a [`PlacedOrder`] always
//! carries a complete payment. Going back never validates and keeps drafts.

mod customer;
mod line;
mod payment;

pub use customer::{CustomerDraft, CustomerField, CustomerInfo, CustomerInput};
pub use line::{DELIVERY_FEE_PKR, OrderLine, OrderSummary, Quantity};
pub use payment::{PaymentDraft, PaymentInfo, PaymentMethod, UnknownPaymentMethod};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{Email, OrderReference, ProductId};

/// A transition was refused because a step's input is incomplete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in: {}", field_list(.0))]
    MissingCustomerFields(Vec<CustomerField>),

    #[error("Please select a payment method")]
    MissingPaymentMethod,

    #[error("Please enter the transaction ID")]
    MissingTransactionId,
}

fn field_list(fields: &[CustomerField]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from wizard transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("that action is not available on this step")]
    WrongStep,

    #[error("the order has already been placed")]
    AlreadyPlaced,

    #[error("already on the first step")]
    NoPreviousStep,
}

/// Wizard step, numbered as shown to the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    ProductDetails = 1,
    CustomerInfo = 2,
    Payment = 3,
}

impl Step {
    pub const ALL: [Self; 3] = [Self::ProductDetails, Self::CustomerInfo, Self::Payment];

    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::ProductDetails => "Product Details",
            Self::CustomerInfo => "Customer Information",
            Self::Payment => "Payment Method",
        }
    }
}

/// Where the wizard is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    ProductDetails,
    CustomerInfo,
    Payment { customer: CustomerInfo },
    Placed(PlacedOrder),
}

/// A submitted order. Nothing is persisted; the reference is for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub reference: OrderReference,
    pub line: OrderLine,
    pub summary: OrderSummary,
    pub customer: CustomerInfo,
    pub payment: PaymentInfo,
}

/// One visitor's order draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    line: OrderLine,
    customer: CustomerDraft,
    payment: PaymentDraft,
    stage: Stage,
}

impl Checkout {
    /// Start a checkout for one unit of `product`, with the customer email
    /// taken from the signed-in account.
    #[must_use]
    pub fn start(product: &Product, email: &Email) -> Self {
        Self {
            line: OrderLine::for_product(product),
            customer: CustomerDraft::new(email),
            payment: PaymentDraft::default(),
            stage: Stage::ProductDetails,
        }
    }

    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.line.product_id
    }

    #[must_use]
    pub const fn line(&self) -> &OrderLine {
        &self.line
    }

    #[must_use]
    pub const fn customer(&self) -> &CustomerDraft {
        &self.customer
    }

    #[must_use]
    pub const fn payment(&self) -> &PaymentDraft {
        &self.payment
    }

    #[must_use]
    pub const fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Current step, or `None` once placed.
    #[must_use]
    pub const fn step(&self) -> Option<Step> {
        match self.stage {
            Stage::ProductDetails => Some(Step::ProductDetails),
            Stage::CustomerInfo => Some(Step::CustomerInfo),
            Stage::Payment { .. } => Some(Step::Payment),
            Stage::Placed(_) => None,
        }
    }

    #[must_use]
    pub const fn placed(&self) -> Option<&PlacedOrder> {
        match &self.stage {
            Stage::Placed(order) => Some(order),
            _ => None,
        }
    }

    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        self.line.summary()
    }

    fn require(&self, step: Step) -> Result<(), CheckoutError> {
        match self.step() {
            None => Err(CheckoutError::AlreadyPlaced),
            Some(current) if current == step => Ok(()),
            Some(_) => Err(CheckoutError::WrongStep),
        }
    }

    /// Add one unit.
    ///
    /// # Errors
    ///
    /// Fails outside the product details step.
    pub fn increment_quantity(&mut self) -> Result<(), CheckoutError> {
        self.require(Step::ProductDetails)?;
        self.line.quantity = self.line.quantity.incremented();
        Ok(())
    }

    /// Remove one unit, stopping at 1.
    ///
    /// # Errors
    ///
    /// Fails outside the product details step.
    pub fn decrement_quantity(&mut self) -> Result<(), CheckoutError> {
        self.require(Step::ProductDetails)?;
        self.line.quantity = self.line.quantity.decremented();
        Ok(())
    }

    /// Set the quantity directly, clamped to at least 1.
    ///
    /// # Errors
    ///
    /// Fails outside the product details step.
    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), CheckoutError> {
        self.require(Step::ProductDetails)?;
        self.line.quantity = Quantity::new(quantity);
        Ok(())
    }

    /// Step 1 -> 2. Not gated.
    ///
    /// # Errors
    ///
    /// Fails outside the product details step.
    pub fn continue_to_customer_info(&mut self) -> Result<(), CheckoutError> {
        self.require(Step::ProductDetails)?;
        self.stage = Stage::CustomerInfo;
        Ok(())
    }

    /// Store the editable customer fields without leaving the step.
    ///
    /// # Errors
    ///
    /// Fails outside the customer info step.
    pub fn update_customer(&mut self, input: CustomerInput) -> Result<(), CheckoutError> {
        self.require(Step::CustomerInfo)?;
        self.customer.update(input);
        Ok(())
    }

    /// Whether step 2 may be left.
    #[must_use]
    pub fn can_continue_to_payment(&self) -> bool {
        self.customer.is_complete()
    }

    /// Step 2 -> 3. On a validation failure the step does not change.
    ///
    /// # Errors
    ///
    /// Fails outside the customer info step or when a field is empty.
    pub fn continue_to_payment(&mut self) -> Result<(), CheckoutError> {
        self.require(Step::CustomerInfo)?;
        let customer = self.customer.validate()?;
        self.stage = Stage::Payment { customer };
        Ok(())
    }

    /// Update the customer draft and try to continue in one go, as the
    /// customer form does.
    ///
    /// # Errors
    ///
    /// See [`Self::continue_to_payment`]. The draft is kept either way.
    pub fn submit_customer(&mut self, input: CustomerInput) -> Result<(), CheckoutError> {
        self.update_customer(input)?;
        self.continue_to_payment()
    }

    /// Choose the payment method.
    ///
    /// # Errors
    ///
    /// Fails outside the payment step.
    pub fn select_payment_method(&mut self, method: PaymentMethod) -> Result<(), CheckoutError> {
        self.require(Step::Payment)?;
        self.payment.method = Some(method);
        Ok(())
    }

    /// Record the transaction reference for a prepaid method.
    ///
    /// # Errors
    ///
    /// Fails outside the payment step.
    pub fn set_transaction_id(&mut self, transaction_id: String) -> Result<(), CheckoutError> {
        self.require(Step::Payment)?;
        self.payment.transaction_id = transaction_id;
        Ok(())
    }

    /// Whether "place order" is enabled.
    #[must_use]
    pub fn can_place_order(&self) -> bool {
        matches!(self.stage, Stage::Payment { .. }) && self.payment.validate().is_ok()
    }

    /// Submit the order and move to the terminal state.
    ///
    /// # Errors
    ///
    /// Fails outside the payment step or when the payment is incomplete.
    pub fn place_order<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<&PlacedOrder, CheckoutError> {
        let customer = match &self.stage {
            Stage::Payment { customer } => customer.clone(),
            Stage::Placed(_) => return Err(CheckoutError::AlreadyPlaced),
            Stage::ProductDetails | Stage::CustomerInfo => return Err(CheckoutError::WrongStep),
        };
        let payment = self.payment.validate()?;
        self.stage = Stage::Placed(PlacedOrder {
            reference: OrderReference::generate(rng),
            line: self.line.clone(),
            summary: self.line.summary(),
            customer,
            payment,
        });
        match &self.stage {
            Stage::Placed(order) => Ok(order),
            _ => Err(CheckoutError::WrongStep),
        }
    }

    /// Step N -> N-1 without validation. Drafts are kept.
    ///
    /// # Errors
    ///
    /// Fails on the first step and once placed.
    pub fn back(&mut self) -> Result<(), CheckoutError> {
        self.stage = match self.stage {
            Stage::ProductDetails => return Err(CheckoutError::NoPreviousStep),
            Stage::CustomerInfo => Stage::ProductDetails,
            Stage::Payment { .. } => Stage::CustomerInfo,
            Stage::Placed(_) => return Err(CheckoutError::AlreadyPlaced),
        };
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::catalog::Catalog;
    use crate::types::Price;

    fn checkout() -> Checkout {
        let catalog = Catalog::builtin();
        let product = catalog.find(ProductId::new(1)).unwrap();
        Checkout::start(product, &Email::parse("bilal@example.com").unwrap())
    }

    fn customer_input() -> CustomerInput {
        CustomerInput {
            name: "Bilal Ahmed".to_string(),
            phone: "03211234567".to_string(),
            address: "12 Mall Road".to_string(),
            city: "Karachi".to_string(),
        }
    }

    fn at_payment() -> Checkout {
        let mut c = checkout();
        c.continue_to_customer_info().unwrap();
        c.submit_customer(customer_input()).unwrap();
        c
    }

    #[test]
    fn test_starts_at_step_one() {
        let c = checkout();
        assert_eq!(c.step(), Some(Step::ProductDetails));
        assert_eq!(c.line().quantity, Quantity::MIN);
        assert_eq!(c.customer().email(), "bilal@example.com");
    }

    #[test]
    fn test_quantity_changes_recompute_totals() {
        let mut c = checkout();
        c.decrement_quantity().unwrap();
        assert_eq!(c.line().quantity.get(), 1);

        c.increment_quantity().unwrap();
        assert_eq!(c.summary().total, Price::pkr(5200));

        c.set_quantity(0).unwrap();
        assert_eq!(c.line().quantity.get(), 1);
    }

    #[test]
    fn test_quantity_locked_after_step_one() {
        let mut c = checkout();
        c.continue_to_customer_info().unwrap();
        assert_eq!(c.increment_quantity(), Err(CheckoutError::WrongStep));
    }

    #[test]
    fn test_customer_step_blocks_until_complete() {
        let mut c = checkout();
        c.continue_to_customer_info().unwrap();

        let mut partial = customer_input();
        partial.city.clear();
        let err = c.submit_customer(partial).unwrap_err();
        assert_eq!(
            err,
            CheckoutError::Validation(ValidationError::MissingCustomerFields(vec![
                CustomerField::City
            ]))
        );
        assert_eq!(c.step(), Some(Step::CustomerInfo));
        assert_eq!(c.customer().name(), "Bilal Ahmed");
        assert!(!c.can_continue_to_payment());

        c.submit_customer(customer_input()).unwrap();
        assert_eq!(c.step(), Some(Step::Payment));
    }

    #[test]
    fn test_payment_gate() {
        let mut c = at_payment();
        assert!(!c.can_place_order());

        c.select_payment_method(PaymentMethod::JazzCash).unwrap();
        assert!(!c.can_place_order());
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            c.place_order(&mut rng).map(|o| o.reference.clone()),
            Err(CheckoutError::Validation(
                ValidationError::MissingTransactionId
            ))
        );

        c.set_transaction_id("JC-998877".to_string()).unwrap();
        assert!(c.can_place_order());

        c.select_payment_method(PaymentMethod::CashOnDelivery).unwrap();
        c.set_transaction_id(String::new()).unwrap();
        assert!(c.can_place_order());
    }

    #[test]
    fn test_place_order_is_terminal() {
        let mut c = at_payment();
        c.select_payment_method(PaymentMethod::CashOnDelivery).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let order = c.place_order(&mut rng).unwrap();
        assert!(order.reference.as_str().starts_with("TH"));
        assert_eq!(order.customer.city, "Karachi");
        assert_eq!(order.summary.total, Price::pkr(2700));
        assert_eq!(c.step(), None);

        assert_eq!(c.back(), Err(CheckoutError::AlreadyPlaced));
        assert_eq!(
            c.select_payment_method(PaymentMethod::JazzCash),
            Err(CheckoutError::AlreadyPlaced)
        );
        assert!(matches!(
            c.place_order(&mut rng),
            Err(CheckoutError::AlreadyPlaced)
        ));
    }

    #[test]
    fn test_back_never_validates() {
        let mut c = at_payment();
        c.back().unwrap();
        assert_eq!(c.step(), Some(Step::CustomerInfo));
        assert_eq!(c.customer().phone(), "03211234567");

        let mut c = checkout();
        c.continue_to_customer_info().unwrap();
        c.update_customer(CustomerInput::default()).unwrap();
        c.back().unwrap();
        assert_eq!(c.step(), Some(Step::ProductDetails));
        assert_eq!(c.back(), Err(CheckoutError::NoPreviousStep));
    }

    #[test]
    fn test_serde_roundtrip_keeps_stage() {
        let c = at_payment();
        let json = serde_json::to_string(&c).unwrap();
        let back: Checkout = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
