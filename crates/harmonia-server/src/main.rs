use std::net::SocketAddr;
use std::sync::Arc;

use harmonia_db::AppState;
use harmonia_migration::MigratorTrait;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Database connection
    let db_config = harmonia_db::DatabaseConfig::from_env();
    tracing::info!("connecting to database...");
    let db = harmonia_db::connect(&db_config)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("running database migrations...");
    harmonia_migration::Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");
    tracing::info!("migrations complete");

    let state = Arc::new(AppState { db });
    let app = harmonia_server::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    tracing::info!(%addr, "server started");

    axum::serve(
        tokio::net::TcpListener::bind(addr).await.unwrap(),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
