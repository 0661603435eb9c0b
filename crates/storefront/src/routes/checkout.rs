//! Checkout wizard route handlers.
//!
//! One draft per visitor lives in the session under
//! [`session_keys::CHECKOUT`]. Every POST applies one wizard transition and
//! redirects back to `GET /buy/{id}`, which renders whichever step the draft
//! is on. Validation failures come back as a flash banner with the draft
//! (and everything typed so far) intact.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use thrivo_core::ProductId;
use thrivo_core::catalog::Product;
use thrivo_core::checkout::{
    Checkout, CheckoutError, CustomerInput, OrderSummary, PaymentMethod, PlacedOrder, Step,
};

use crate::config::PaymentAccount;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::SessionContext;
use crate::models::{Flash, session_keys};
use crate::state::AppState;
use crate::views::{Nav, PageChrome, ProductView};

// =============================================================================
// Draft Storage
// =============================================================================

async fn load_draft(session: &Session) -> Result<Option<Checkout>> {
    Ok(session.get(session_keys::CHECKOUT).await?)
}

async fn save_draft(session: &Session, draft: &Checkout) -> Result<()> {
    session.insert(session_keys::CHECKOUT, draft).await?;
    Ok(())
}

async fn discard(session: &Session) -> Result<()> {
    session.remove_value(session_keys::CHECKOUT).await?;
    Ok(())
}

/// Drop the checkout draft when the visitor navigates to another page.
///
/// Applied to protected pages outside `/buy`; only GETs count as navigation.
pub async fn discard_draft_on_navigation(
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::GET {
        if let Err(e) = discard(&session).await {
            return e.into_response();
        }
    }
    next.run(request).await
}

fn parse_product_id(raw: &str) -> Result<ProductId> {
    raw.parse::<ProductId>()
        .map_err(|_| AppError::NotFound(format!("product {raw}")))
}

fn find_product(state: &AppState, id: ProductId) -> Result<&Product> {
    state
        .catalog()
        .find(id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

fn wizard_url(id: ProductId) -> String {
    format!("/buy/{id}")
}

/// Load the draft for `id` and apply `transition`, saving the result.
///
/// A missing draft, or one for another product, sends the visitor back to
/// the wizard page, which starts a fresh one. Transitions that do not apply
/// to the current step (a stale form) are ignored.
async fn apply(
    ctx: &SessionContext,
    id: ProductId,
    transition: impl FnOnce(&mut Checkout) -> std::result::Result<(), CheckoutError>,
) -> Result<Redirect> {
    let url = wizard_url(id);
    let Some(mut draft) = load_draft(ctx.session()).await? else {
        return Ok(Redirect::to(&url));
    };
    if draft.product_id() != id {
        return Ok(Redirect::to(&url));
    }

    match transition(&mut draft) {
        Ok(()) => {}
        Err(CheckoutError::Validation(e)) => {
            Flash::error(e.to_string()).push(ctx.session()).await?;
        }
        Err(e) => {
            tracing::debug!(error = %e, "stale checkout action ignored");
        }
    }
    save_draft(ctx.session(), &draft).await?;

    Ok(Redirect::to(&url))
}

// =============================================================================
// Templates
// =============================================================================

/// A step in the progress indicator.
pub struct StepMarker {
    pub number: u8,
    pub title: &'static str,
    pub current: bool,
    pub done: bool,
}

impl StepMarker {
    fn all(current: Step) -> Vec<Self> {
        Step::ALL
            .into_iter()
            .map(|step| Self {
                number: step.number(),
                title: step.title(),
                current: step == current,
                done: step < current,
            })
            .collect()
    }
}

/// Payment method option on step 3.
pub struct MethodOption {
    pub slug: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Formatted order amounts.
pub struct SummaryView {
    pub unit_price: String,
    pub quantity: u32,
    pub subtotal: String,
    pub delivery_fee: String,
    pub total: String,
}

impl From<OrderSummary> for SummaryView {
    fn from(summary: OrderSummary) -> Self {
        Self {
            unit_price: summary.unit_price.display(),
            quantity: summary.quantity,
            subtotal: summary.subtotal.display(),
            delivery_fee: summary.delivery_fee.display(),
            total: summary.total.display(),
        }
    }
}

/// The wizard page; renders whichever step the draft is on.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/wizard.html")]
pub struct WizardTemplate {
    pub nav: Nav,
    pub flash: Option<Flash>,
    pub product: ProductView,
    pub step: u8,
    pub steps: Vec<StepMarker>,
    pub summary: SummaryView,
    pub action_base: String,
    // Step 2
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub can_continue: bool,
    // Step 3
    pub methods: Vec<MethodOption>,
    pub selected_method: Option<&'static str>,
    pub needs_transaction_id: bool,
    pub transaction_id: String,
    pub can_place: bool,
    pub account: PaymentAccount,
}

impl WizardTemplate {
    fn new(chrome: PageChrome, product: &Product, draft: &Checkout, step: Step, account: PaymentAccount) -> Self {
        let customer = draft.customer();
        let payment = draft.payment();
        Self {
            nav: chrome.nav,
            flash: chrome.flash,
            product: ProductView::from(product),
            step: step.number(),
            steps: StepMarker::all(step),
            summary: draft.summary().into(),
            action_base: wizard_url(draft.product_id()),
            name: customer.name().to_string(),
            email: customer.email().to_string(),
            phone: customer.phone().to_string(),
            address: customer.address().to_string(),
            city: customer.city().to_string(),
            can_continue: draft.can_continue_to_payment(),
            methods: PaymentMethod::ALL
                .into_iter()
                .map(|m| MethodOption {
                    slug: m.slug(),
                    label: m.label(),
                    selected: payment.method == Some(m),
                })
                .collect(),
            selected_method: payment.method.map(PaymentMethod::label),
            needs_transaction_id: payment.needs_transaction_id(),
            transaction_id: payment.transaction_id.clone(),
            can_place: payment.method.is_some(),
            account,
        }
    }
}

/// Order confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/placed.html")]
pub struct PlacedTemplate {
    pub nav: Nav,
    pub flash: Option<Flash>,
    pub reference: String,
    pub product_name: String,
    pub summary: SummaryView,
    pub customer_name: String,
    pub customer_email: String,
    pub method: &'static str,
    pub transaction_id: Option<String>,
}

impl PlacedTemplate {
    fn new(chrome: PageChrome, order: &PlacedOrder) -> Self {
        Self {
            nav: chrome.nav,
            flash: chrome.flash,
            reference: order.reference.to_string(),
            product_name: order.line.product_name.clone(),
            summary: order.summary.into(),
            customer_name: order.customer.name.clone(),
            customer_email: order.customer.email.clone(),
            method: order.payment.method.label(),
            transaction_id: order.payment.transaction_id.clone(),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /buy
pub async fn start() -> Redirect {
    Redirect::to("/buy/1")
}

/// GET /buy/{id}
///
/// Starts a draft if there is none for this product. Once an order is
/// placed the confirmation is shown exactly once and the draft discarded.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(raw_id): Path<String>,
) -> Result<Response> {
    let id = parse_product_id(&raw_id)?;
    let product = find_product(&state, id)?;
    let user = ctx
        .user()
        .ok_or_else(|| AppError::Internal("checkout reached without a session".into()))?;

    let draft = match load_draft(ctx.session()).await? {
        Some(draft) if draft.product_id() == id => draft,
        _ => {
            let draft = Checkout::start(product, &user.email);
            save_draft(ctx.session(), &draft).await?;
            tracing::debug!(product_id = %id, "checkout started");
            draft
        }
    };

    let chrome = PageChrome::take(&ctx, "checkout").await?;
    match draft.step() {
        Some(step) => Ok(WizardTemplate::new(
            chrome,
            product,
            &draft,
            step,
            state.config().payment.clone(),
        )
        .into_response()),
        None => {
            discard(ctx.session()).await?;
            let order = draft
                .placed()
                .ok_or_else(|| AppError::Internal("checkout has no step and no order".into()))?;
            Ok(PlacedTemplate::new(chrome, order).into_response())
        }
    }
}

/// Quantity stepper form.
#[derive(Debug, Deserialize)]
pub struct QuantityForm {
    pub op: String,
}

/// POST /buy/{id}/quantity
pub async fn quantity(
    ctx: SessionContext,
    Path(raw_id): Path<String>,
    Form(form): Form<QuantityForm>,
) -> Result<Redirect> {
    let id = parse_product_id(&raw_id)?;
    let op = form.op;
    apply(&ctx, id, |draft| match op.as_str() {
        "increment" => draft.increment_quantity(),
        "decrement" => draft.decrement_quantity(),
        _ => Err(CheckoutError::WrongStep),
    })
    .await
}

/// POST /buy/{id}/continue
pub async fn continue_to_customer(
    ctx: SessionContext,
    Path(raw_id): Path<String>,
) -> Result<Redirect> {
    let id = parse_product_id(&raw_id)?;
    apply(&ctx, id, Checkout::continue_to_customer_info).await
}

/// POST /buy/{id}/customer
pub async fn customer(
    ctx: SessionContext,
    Path(raw_id): Path<String>,
    Form(input): Form<CustomerInput>,
) -> Result<Redirect> {
    let id = parse_product_id(&raw_id)?;
    apply(&ctx, id, |draft| draft.submit_customer(input)).await
}

/// Payment method selection form.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    #[serde(default)]
    pub method: String,
}

/// POST /buy/{id}/payment
pub async fn payment(
    ctx: SessionContext,
    Path(raw_id): Path<String>,
    Form(form): Form<PaymentForm>,
) -> Result<Redirect> {
    let id = parse_product_id(&raw_id)?;
    let method = form
        .method
        .parse::<PaymentMethod>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    apply(&ctx, id, |draft| draft.select_payment_method(method)).await
}

/// Place-order form.
#[derive(Debug, Deserialize)]
pub struct PlaceForm {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// POST /buy/{id}/place
#[instrument(skip(ctx, form))]
pub async fn place(
    ctx: SessionContext,
    Path(raw_id): Path<String>,
    Form(form): Form<PlaceForm>,
) -> Result<Redirect> {
    let id = parse_product_id(&raw_id)?;
    let uid = ctx.user().map(|u| u.uid.to_string()).unwrap_or_default();

    apply(&ctx, id, |draft| {
        if let Some(transaction_id) = form.transaction_id {
            draft.set_transaction_id(transaction_id)?;
        }
        let order = draft.place_order(&mut rand::rng())?;
        tracing::info!(
            uid = %uid,
            reference = %order.reference,
            product_id = %order.line.product_id,
            quantity = order.summary.quantity,
            total = %order.summary.total,
            method = %order.payment.method,
            "order placed"
        );
        add_breadcrumb(
            "checkout",
            "Order placed",
            &[("reference", order.reference.as_str())],
        );
        Ok(())
    })
    .await
}

/// POST /buy/{id}/back
///
/// From step 1 "back" leaves the wizard for the product listing.
pub async fn back(ctx: SessionContext, Path(raw_id): Path<String>) -> Result<Redirect> {
    let id = parse_product_id(&raw_id)?;
    if let Some(draft) = load_draft(ctx.session()).await?
        && draft.product_id() == id
        && draft.step() == Some(Step::ProductDetails)
    {
        return Ok(Redirect::to("/products"));
    }
    apply(&ctx, id, Checkout::back).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_markers() {
        let markers = StepMarker::all(Step::CustomerInfo);
        assert_eq!(markers.len(), 3);
        assert!(markers[0].done && !markers[0].current);
        assert!(markers[1].current && !markers[1].done);
        assert!(!markers[2].current && !markers[2].done);
    }

    #[test]
    fn test_unknown_product_id_is_not_found() {
        assert!(matches!(
            parse_product_id("abc"),
            Err(AppError::NotFound(_))
        ));
    }
}
