//! Shared fixtures for handler tests: an in-memory database with the schema
//! applied and one seeded user/link, plus helpers to drive the router.
//! [`file_state`] gives a file-backed pool for tests that need more than one
//! connection.

use std::{
    str::FromStr,
    sync::{Arc, OnceLock},
};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::{
    auth::password::hash_password,
    config::{AppConfig, JwtConfig},
    state::{self, AppState},
};

pub const TEST_SECRET: &str = "test-secret-key-for-testing";
pub const SEED_EMAIL: &str = "test@gmail.com";
pub const SEED_PASSWORD: &str = "strong_password";

/// Argon2 is slow in debug builds; hash the seed password once per run.
fn seed_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(SEED_PASSWORD).expect("hash seed password"))
}

async fn memory_pool() -> SqlitePool {
    // One connection that never expires: each in-memory connection is its own database.
    let options = SqliteConnectOptions::from_str("sqlite::memory:").expect("memory url");
    let db = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("open in-memory database");
    migrate(&db).await;
    db
}

async fn migrate(db: &SqlitePool) {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .expect("apply migrations");
}

async fn seed(db: &SqlitePool) {
    sqlx::query(
        "INSERT INTO users (email, password, first_name, last_name, image_url) \
         VALUES (?, ?, 'Test', 'Testowy', 'https://link_to_image.com')",
    )
    .bind(SEED_EMAIL)
    .bind(seed_hash())
    .execute(db)
    .await
    .expect("seed user");
    sqlx::query(
        "INSERT INTO links (user_id, platform, url, created) \
         VALUES (1, 'Twitter', 'https://twitter.com/test', '2025-03-16 12:00:00')",
    )
    .execute(db)
    .await
    .expect("seed link");
}

async fn state_with(secret: Option<&str>) -> AppState {
    let db = memory_pool().await;
    seed(&db).await;
    seeded_state(db, "sqlite::memory:", secret)
}

fn seeded_state(db: SqlitePool, database_url: &str, secret: Option<&str>) -> AppState {
    let config = Arc::new(AppConfig {
        database_url: database_url.into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt: JwtConfig {
            secret: secret.map(str::to_owned),
        },
    });
    AppState::from_parts(db, config)
}

pub async fn test_state() -> AppState {
    state_with(Some(TEST_SECRET)).await
}

pub async fn test_state_without_secret() -> AppState {
    state_with(None).await
}

/// Seeded state on a database file, opened the way the server opens it.
/// Keep the directory alive for as long as the state is used.
pub async fn file_state() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("linkshare.sqlite").display());
    let db = state::connect(&url).await.expect("open database file");
    migrate(&db).await;
    seed(&db).await;
    (dir, seeded_state(db, &url, Some(TEST_SECRET)))
}

pub fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    raw_request(method, uri, Some("application/json"), &body.to_string())
}

pub fn raw_request(
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    builder.body(Body::from(body.to_owned())).expect("request")
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

/// Status and raw body bytes.
pub async fn send_raw(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let res = app.clone().oneshot(req).await.expect("router is infallible");
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, bytes.to_vec())
}

/// Status and JSON body (`Value::Null` when the body is not JSON).
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}
