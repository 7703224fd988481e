//! HTTP surface of the catalog: route table, middleware stack, shared
//! response plumbing. Handlers live in [`api`], the capability check in
//! [`identity`]; everything stateful goes through `harmonia_core`.

use axum::{
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::CorsLayer,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use harmonia_db::AppState;

pub mod api;
pub mod identity;

#[derive(Serialize)]
struct ApiStatus {
    status: &'static str,
    version: &'static str,
}

async fn healthz() -> Json<ApiStatus> {
    Json(ApiStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the full application router over the given state.
pub fn app(state: Arc<AppState>) -> Router {
    // Rate limiter for vote casting: bursts are fine (rating down a list),
    // sustained hammering is not. Keyed on the forwarded client IP since the
    // service sits behind the identity gateway.
    let vote_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .per_second(1)
            .burst_size(30)
            .finish()
            .expect("failed to build rate limiter config"),
    );

    // Read + vote routes (any authenticated role)
    let client_api = Router::new()
        .route("/artists", get(api::artists::list_artists))
        .route("/artists/search", get(api::artists::search_artists))
        .route("/artists/{id}", get(api::artists::get_artist))
        .route("/categories", get(api::categories::list_categories))
        .route("/categories/{id}", get(api::categories::get_category))
        .route("/albums", get(api::albums::list_albums))
        .route("/albums/{id}", get(api::albums::get_album))
        .route("/songs", get(api::songs::list_songs))
        .route("/songs/{id}", get(api::songs::get_song))
        .route("/biographies", get(api::biographies::list_biographies))
        .route("/biographies/{id}", get(api::biographies::get_biography))
        .route("/search", get(api::search::search))
        .route("/votes/status", get(api::votes::vote_status))
        .merge(
            Router::new()
                .route("/votes", post(api::votes::cast_vote))
                .layer(GovernorLayer::new(vote_governor_conf)),
        )
        .layer(axum_middleware::from_fn(identity::require_user));

    // Catalog mutations (admin only)
    let admin_api = Router::new()
        .route("/artists", post(api::artists::create_artist))
        .route(
            "/artists/{id}",
            axum::routing::put(api::artists::update_artist).delete(api::artists::delete_artist),
        )
        .route("/categories", post(api::categories::create_category))
        .route(
            "/categories/{id}",
            axum::routing::put(api::categories::update_category)
                .delete(api::categories::delete_category),
        )
        .route("/albums", post(api::albums::create_album))
        .route(
            "/albums/{id}",
            axum::routing::put(api::albums::update_album).delete(api::albums::delete_album),
        )
        .route("/songs", post(api::songs::create_song))
        .route(
            "/songs/{id}",
            axum::routing::put(api::songs::update_song).delete(api::songs::delete_song),
        )
        .route("/songs/{id}/album", axum::routing::put(api::songs::reassign_song))
        .route("/biographies", post(api::biographies::create_biography))
        .route(
            "/biographies/{id}",
            axum::routing::put(api::biographies::update_biography)
                .delete(api::biographies::delete_biography),
        )
        .layer(axum_middleware::from_fn(identity::require_admin));

    // CORS configuration — restrict to configured origins
    let cors = {
        let allowed_origins_str = std::env::var("CORS_ORIGINS").unwrap_or_default();
        if allowed_origins_str.is_empty() {
            tracing::warn!(
                "CORS_ORIGINS not set — defaulting to restrictive CORS. \
                 Set CORS_ORIGINS=http://localhost:3000 for dev."
            );
            CorsLayer::new()
        } else {
            let origins: Vec<HeaderValue> = allowed_origins_str
                .split(',')
                .filter_map(|s| HeaderValue::from_str(s.trim()).ok())
                .collect();
            tracing::info!("CORS allowed origins: {:?}", origins);
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(tower_http::cors::Any)
        }
    };

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", client_api.merge(admin_api))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state)
}
