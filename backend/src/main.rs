//! Controlled Medicine Inventory - Backend Server
//!
//! Stock ledger, reporting and audit trail for the controlled medicines of a
//! hospital pharmacy service.

use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

pub use config::{Config, LogFormat};

use services::{AuditService, AuthService, SessionRegistry};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    // Initialize tracing
    let (pretty, json) = match config.log.format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cmi_server=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(pretty)
        .with(json)
        .init();

    tracing::info!("Starting Controlled Medicine Inventory Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("Exit policy: {:?}", config.ledger.exit_policy);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    AuthService::new(db_pool.clone(), &config)
        .bootstrap_admin(&config.bootstrap)
        .await?;

    // Inactivity expiry is audited like an explicit logout
    let audit = AuditService::new(db_pool.clone());
    let sessions = SessionRegistry::new(config.session.inactivity_timeout(), move |expired| {
        tracing::info!(
            user_id = %expired.user_id,
            session_id = %expired.session_id,
            "Session expired after inactivity"
        );
        audit.record(expired.audit_event());
    });

    // Create application state
    let state = AppState {
        db: db_pool,
        config: Arc::new(config.clone()),
        sessions,
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Controlled Medicine Inventory API v1.0"
}
