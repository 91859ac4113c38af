//! Common test utilities

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use storefront_checkout::{build_app, AppState, MemoryStore};
use tokio::sync::OnceCell;
use tower::util::ServiceExt;

/// Router over a fresh in-memory store
pub fn memory_app() -> (Router, MemoryStore) {
    let store = MemoryStore::new();
    let app = build_app(AppState::in_memory(store.clone()));
    (app, store)
}

/// Send one request and decode the JSON body (Null when empty)
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

/// Create a product over HTTP and return its id
pub async fn create_product(app: &Router, name: &str, price: i64, stock: i64) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/products",
        Some(serde_json::json!({ "name": name, "price": price, "stock": stock })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "Product creation failed: {}", body);
    body["id"].as_i64().unwrap()
}

static SCHEMA: OnceCell<()> = OnceCell::const_new();

/// Setup test database - apply the schema once per test binary
///
/// Tables are not truncated; each test works on the rows it creates so the
/// suite can run in parallel.
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    SCHEMA
        .get_or_init(|| async {
            let schema = include_str!("../../migrations/001_initial_schema.sql");
            (&pool)
                .execute(schema)
                .await
                .expect("Failed to apply schema");
        })
        .await;

    pool
}
