use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::business::NamePolicy;
use crate::config::ServiceConfig;
use crate::storage::SqliteStore;

pub mod routes;

/// Server state
///
/// Holds only the database location; every request opens its own connection.
pub struct AppState {
    pub database_path: PathBuf,
    pub busy_timeout: Duration,
    pub name_policy: NamePolicy,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            database_path: config.database_path(),
            busy_timeout: config.busy_timeout(),
            name_policy: config.name_policy,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Open a fresh connection for one request
    pub fn open_store(&self) -> crate::Result<SqliteStore> {
        SqliteStore::open_with_timeout(&self.database_path, self.busy_timeout)
    }
}

/// Build the HTTP router
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/import-business-symptoms", post(routes::import_business_symptoms))
        .route("/business-symptoms", get(routes::list_business_symptoms))
        .route("/stats", get(routes::get_stats))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: &ServiceConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(config));

    // Fail fast on an unusable database and apply pending migrations before serving
    let store = state.open_store()?;
    tracing::info!(
        database = %state.database_path.display(),
        schema_version = store.schema_version()?,
        "Database ready"
    );
    drop(store);

    let app = router(state);

    let ip: std::net::IpAddr = config.host.parse()?;
    let addr = SocketAddr::from((ip, config.port));
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
