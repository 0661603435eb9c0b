//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::SessionContext;
use crate::models::Flash;
use crate::state::AppState;
use crate::views::{Nav, PageChrome, ProductView};

/// A selling point on the home page.
#[derive(Clone)]
pub struct Feature {
    pub title: &'static str,
    pub text: &'static str,
}

const FEATURES: [Feature; 3] = [
    Feature {
        title: "Quality Tested",
        text: "Every batch is lab-tested for purity and protein content.",
    },
    Feature {
        title: "Fast Delivery",
        text: "Delivered anywhere in Pakistan within 2-4 working days.",
    },
    Feature {
        title: "Local Payments",
        text: "Pay with JazzCash, EasyPaisa, bank transfer or cash on delivery.",
    },
];

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: Nav,
    pub flash: Option<Flash>,
    pub products: Vec<ProductView>,
    pub features: Vec<Feature>,
}

/// Display the home page.
#[instrument(skip(state, ctx))]
pub async fn home(State(state): State<AppState>, ctx: SessionContext) -> Result<HomeTemplate> {
    let PageChrome { nav, flash } = PageChrome::take(&ctx, "home").await?;

    Ok(HomeTemplate {
        nav,
        flash,
        products: state
            .catalog()
            .products()
            .iter()
            .map(ProductView::from)
            .collect(),
        features: FEATURES.to_vec(),
    })
}
