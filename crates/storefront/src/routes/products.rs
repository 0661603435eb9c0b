//! Product listing route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::instrument;

use thrivo_core::catalog::{Category, CatalogFilter};

use crate::error::Result;
use crate::filters;
use crate::middleware::SessionContext;
use crate::models::Flash;
use crate::state::AppState;
use crate::views::{Nav, PageChrome, ProductView};

/// Query parameters for the listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    /// Category slug; missing, empty, "all" or unknown means every category.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

impl ListingQuery {
    fn filter(&self) -> CatalogFilter {
        CatalogFilter {
            category: self
                .category
                .as_deref()
                .and_then(|slug| slug.parse::<Category>().ok()),
            search: self.q.clone().unwrap_or_default(),
        }
    }
}

/// A category tab.
pub struct CategoryTab {
    pub slug: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products.html")]
pub struct ProductsTemplate {
    pub nav: Nav,
    pub flash: Option<Flash>,
    pub tabs: Vec<CategoryTab>,
    pub selected_category: &'static str,
    pub search: String,
    pub products: Vec<ProductView>,
}

/// Display the product listing.
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(query): Query<ListingQuery>,
) -> Result<ProductsTemplate> {
    let PageChrome { nav, flash } = PageChrome::take(&ctx, "products").await?;
    let filter = query.filter();
    let selected_category = filter.category.map_or("all", Category::slug);

    let mut tabs = vec![CategoryTab {
        slug: "all",
        label: "All Products",
        selected: filter.category.is_none(),
    }];
    tabs.extend(Category::ALL.into_iter().map(|c| CategoryTab {
        slug: c.slug(),
        label: c.label(),
        selected: filter.category == Some(c),
    }));

    let products = state
        .catalog()
        .filter(&filter)
        .into_iter()
        .map(ProductView::from)
        .collect();

    Ok(ProductsTemplate {
        nav,
        flash,
        tabs,
        selected_category,
        search: filter.search,
        products,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_category_means_all() {
        let query = ListingQuery {
            category: Some("snacks".to_string()),
            q: None,
        };
        assert_eq!(query.filter(), CatalogFilter::default());
    }

    #[test]
    fn test_query_maps_to_filter() {
        let query = ListingQuery {
            category: Some("powder".to_string()),
            q: Some("mix".to_string()),
        };
        let filter = query.filter();
        assert_eq!(filter.category, Some(Category::Powder));
        assert_eq!(filter.search, "mix");
    }
}
