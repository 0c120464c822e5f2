//! Home and about pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;

use crate::error::Result;
use crate::state::AppState;
use crate::views::{Page, SnippetView, ViewContext};

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub snippets: Vec<SnippetView>,
}

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub page: Page,
}

/// Display the latest snippets.
pub async fn home(State(state): State<AppState>, view: ViewContext) -> Result<HomeTemplate> {
    let snippets = state.snippets().latest().await?;

    Ok(HomeTemplate {
        page: view.page().await,
        snippets: snippets.iter().map(SnippetView::from).collect(),
    })
}

/// Display the about page.
pub async fn about(view: ViewContext) -> AboutTemplate {
    AboutTemplate { page: view.page().await }
}
