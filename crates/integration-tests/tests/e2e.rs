//! End-to-end tests over a real TCP listener.
//!
//! The in-memory tests run by default. The `PostgreSQL` test needs a
//! migratable database in `SNIPPETBOX_TEST_DATABASE_URL`.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::{Client, StatusCode, header};
use secrecy::SecretString;
use tower_sessions_sqlx_store::PostgresStore;

use snippetbox_integration_tests::{TestServer, browser, csrf_token};
use snippetbox_web::config::WebConfig;
use snippetbox_web::db;
use snippetbox_web::state::AppState;

const PASSWORD: &str = "pa55word!";

fn unique_email() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("user{nanos}@example.com")
}

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

async fn page(client: &Client, server: &TestServer, path: &str) -> (StatusCode, String) {
    let response = client
        .get(server.url(path))
        .send()
        .await
        .expect("GET failed");
    let status = response.status();
    (status, response.text().await.expect("unreadable body"))
}

async fn submit(
    client: &Client,
    server: &TestServer,
    page_path: &str,
    action: &str,
    fields: &[(&str, &str)],
) -> reqwest::Response {
    let (status, html) = page(client, server, page_path).await;
    assert_eq!(status, StatusCode::OK, "{page_path}");
    let token = csrf_token(&html).expect("page has no CSRF field");

    let mut form: Vec<(&str, &str)> = fields.to_vec();
    form.push(("csrf_token", token.as_str()));

    client
        .post(server.url(action))
        .form(&form)
        .send()
        .await
        .expect("POST failed")
}

async fn log_in(client: &Client, server: &TestServer, email: &str) {
    let response = submit(
        client,
        server,
        "/user/login",
        "/user/login",
        &[("email", email), ("password", PASSWORD)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

/// Signup, login, create and view a snippet, then logout.
async fn snippet_journey(server: &TestServer) {
    let client = browser();
    let email = unique_email();

    let response = submit(
        &client,
        server,
        "/user/signup",
        "/user/signup",
        &[("name", "Alice"), ("email", email.as_str()), ("password", PASSWORD)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user/login");

    let (_, html) = page(&client, server, "/user/login").await;
    assert!(html.contains("Your signup was successful. Please log in."));

    log_in(&client, server, &email).await;

    let response = submit(
        &client,
        server,
        "/snippet/create",
        "/snippet/create",
        &[
            ("title", "An old silent pond"),
            ("content", "A frog jumps into the pond,\nsplash! Silence again."),
            ("expires", "365"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let view_path = location(&response);
    assert!(view_path.starts_with("/snippet/view/"));

    let (status, html) = page(&client, server, &view_path).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("An old silent pond"));

    let response = submit(&client, server, "/", "/user/logout", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = client
        .get(server.url("/snippet/create"))
        .send()
        .await
        .expect("GET failed");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user/login");
}

#[tokio::test]
async fn test_snippet_journey_in_memory() {
    let server = TestServer::start().await;
    snippet_journey(&server).await;
}

#[tokio::test]
async fn test_concurrent_requests_on_one_session() {
    let server = TestServer::start().await;
    let client = browser();
    let email = unique_email();

    let response = submit(
        &client,
        &server,
        "/user/signup",
        "/user/signup",
        &[("name", "Bob"), ("email", email.as_str()), ("password", PASSWORD)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    log_in(&client, &server, &email).await;

    let statuses = futures::future::join_all((0..10).map(|_| page(&client, &server, "/"))).await;
    assert!(statuses.iter().all(|(status, _)| *status == StatusCode::OK));

    let (status, html) = page(&client, &server, "/account/view").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(&email));
}

#[tokio::test]
async fn test_independent_clients_get_distinct_sessions() {
    let server = TestServer::start().await;

    let responses = futures::future::join_all((0..20).map(|_| {
        let url = server.url("/");
        async move { browser().get(url).send().await.expect("GET failed") }
    }))
    .await;

    let ids: HashSet<String> = responses
        .iter()
        .filter_map(|response| {
            response
                .cookies()
                .find(|cookie| cookie.name() == "session_id")
                .map(|cookie| cookie.value().to_owned())
        })
        .collect();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn test_user_removed_out_of_band_loses_access() {
    let server = TestServer::start().await;
    let client = browser();
    let email = unique_email();

    submit(
        &client,
        &server,
        "/user/signup",
        "/user/signup",
        &[("name", "Carol"), ("email", email.as_str()), ("password", PASSWORD)],
    )
    .await;
    log_in(&client, &server, &email).await;

    let parsed = snippetbox_core::Email::parse(&email).expect("valid email");
    let removed = server
        .state()
        .users()
        .delete_by_email(&parsed)
        .await
        .expect("delete failed");
    assert!(removed);

    let response = client
        .get(server.url("/account/view"))
        .send()
        .await
        .expect("GET failed");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user/login");
}

#[tokio::test]
#[ignore = "Requires SNIPPETBOX_TEST_DATABASE_URL pointing at a PostgreSQL database"]
async fn test_snippet_journey_postgres() {
    let database_url = std::env::var("SNIPPETBOX_TEST_DATABASE_URL")
        .expect("SNIPPETBOX_TEST_DATABASE_URL is not set");
    let pool = db::create_pool(&SecretString::from(database_url))
        .await
        .expect("Failed to connect");
    sqlx::migrate!("../web/migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate");
    PostgresStore::new(pool.clone())
        .migrate()
        .await
        .expect("Failed to create session table");

    let server = TestServer::with_state(AppState::postgres(WebConfig::development(), pool)).await;
    snippet_journey(&server).await;
}
