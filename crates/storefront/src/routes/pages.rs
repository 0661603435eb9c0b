//! Static content pages.

use askama::Template;
use askama_web::WebTemplate;

use crate::error::Result;
use crate::filters;
use crate::middleware::SessionContext;
use crate::models::Flash;
use crate::views::{Nav, PageChrome};

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub nav: Nav,
    pub flash: Option<Flash>,
    pub values: Vec<(&'static str, &'static str)>,
}

/// Display the about page.
pub async fn about(ctx: SessionContext) -> Result<AboutTemplate> {
    let PageChrome { nav, flash } = PageChrome::take(&ctx, "about").await?;

    Ok(AboutTemplate {
        nav,
        flash,
        values: vec![
            (
                "Honest Labels",
                "What is on the label is what is in the tub. No proprietary blends.",
            ),
            (
                "Made for Pakistan",
                "Priced in rupees, delivered nationwide, paid the way you already pay.",
            ),
            (
                "Real Support",
                "Questions about a product or an order go to a person, not a bot.",
            ),
        ],
    })
}
