// Shared test utilities for integration tests
#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use std::sync::Arc;

use harmonia_db::AppState;
use harmonia_migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};

/// Create a test AppState over a fresh in-memory SQLite database with the
/// real migrations applied. One pooled connection so all queries share it.
pub async fn test_app_state() -> Arc<AppState> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1);
    let db = Database::connect(opt)
        .await
        .expect("failed to open in-memory sqlite");
    Migrator::up(&db, None).await.expect("failed to run migrations");
    Arc::new(AppState { db })
}

pub async fn test_server() -> (TestServer, Arc<AppState>) {
    let state = test_app_state().await;
    let server = TestServer::new(harmonia_server::app(state.clone()))
        .expect("failed to build test server");
    (server, state)
}

/// Identity headers as the upstream gateway would set them.
pub fn as_user(req: TestRequest, login: &str, role: &str) -> TestRequest {
    req.add_header(
        HeaderName::from_static("x-user"),
        HeaderValue::from_str(login).unwrap(),
    )
    .add_header(
        HeaderName::from_static("x-role"),
        HeaderValue::from_str(role).unwrap(),
    )
    // forwarded client address, consumed by the vote rate limiter
    .add_header(
        HeaderName::from_static("x-forwarded-for"),
        HeaderValue::from_static("127.0.0.1"),
    )
}

pub fn as_admin(req: TestRequest) -> TestRequest {
    as_user(req, "admin", "admin")
}

pub fn as_client(req: TestRequest, login: &str) -> TestRequest {
    as_user(req, login, "client")
}
