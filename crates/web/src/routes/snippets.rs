//! Snippet route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use snippetbox_core::SnippetId;

use crate::error::{AppError, Result};
use crate::forms::SnippetCreateForm;
use crate::models::{NewSnippet, session_keys};
use crate::state::AppState;
use crate::views::{Page, SnippetView, ViewContext};

/// Flash shown after a snippet is saved.
pub const CREATED_FLASH: &str = "Snippet successfully created!";

/// Snippet page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/view.html")]
pub struct ViewTemplate {
    pub page: Page,
    pub snippet: SnippetView,
}

/// Snippet creation form template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/create.html")]
pub struct CreateTemplate {
    pub page: Page,
    pub form: SnippetCreateForm,
}

/// Display a single snippet.
///
/// Malformed, zero and negative ids are reported as not found.
pub async fn view(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    view: ViewContext,
) -> Result<ViewTemplate> {
    let id = SnippetId::parse(&raw_id)
        .map_err(|_| AppError::NotFound(format!("snippet {raw_id}")))?;
    let snippet = state.snippets().get(id).await?;

    Ok(ViewTemplate {
        page: view.page().await,
        snippet: SnippetView::from(&snippet),
    })
}

/// Display the snippet creation form.
pub async fn create_form(view: ViewContext) -> CreateTemplate {
    CreateTemplate {
        page: view.page().await,
        form: SnippetCreateForm::blank(),
    }
}

/// Handle snippet creation form submission.
pub async fn create(
    State(state): State<AppState>,
    view: ViewContext,
    form: std::result::Result<Form<SnippetCreateForm>, FormRejection>,
) -> Result<Response> {
    let Form(mut form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let Some(expires_days) = form.validate() else {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            CreateTemplate {
                page: view.page().await,
                form,
            },
        )
            .into_response());
    };

    let id = state
        .snippets()
        .insert(&NewSnippet {
            title: form.title,
            content: form.content,
            expires_days,
        })
        .await?;
    tracing::info!(snippet_id = %id, "snippet created");

    view.session()
        .insert(session_keys::FLASH, CREATED_FLASH)
        .await?;

    Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
}
