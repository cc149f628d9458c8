//! Polydoc API Gateway
//!
//! The single entry point for all external API requests. Handles:
//! - OCR task submission and polling
//! - Original / translated document downloads
//! - Translation memory upload, listing, editing, export
//! - Settings and machine translation
//! - Observability (logging, metrics, tracing)

mod artifacts;
mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use polydoc_common::{
    config::AppConfig,
    db::{DbPool, Repository},
    errors::Result,
    metrics,
    ocr::{CloudOcr, OcrEngine},
    translate::{ChatTranslator, Translator},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    /// Test override; when unset, engines are built per request so that
    /// credentials stored in settings take effect without a restart
    pub ocr: Option<Arc<dyn OcrEngine>>,
    pub translator: Option<Arc<dyn Translator>>,
}

impl AppState {
    pub fn repository(&self) -> Repository {
        Repository::new(self.db.clone())
    }

    /// OCR engine with settings-stored credentials taking precedence
    pub async fn ocr_engine(&self) -> Result<Arc<dyn OcrEngine>> {
        if let Some(engine) = &self.ocr {
            return Ok(engine.clone());
        }
        let mut engine = CloudOcr::new(&self.config.ocr)?;
        if let Some(settings) = self.repository().get_settings().await? {
            if let (Some(app_id), Some(password)) = (settings.ocr_app_id, settings.ocr_password) {
                engine = engine.with_credentials(app_id, password);
            }
        }
        Ok(Arc::new(engine))
    }

    /// Translator with a settings-stored API key taking precedence
    pub async fn translator(&self) -> Result<Arc<dyn Translator>> {
        if let Some(translator) = &self.translator {
            return Ok(translator.clone());
        }
        let mut translator = ChatTranslator::new(&self.config.translator)?;
        if let Some(settings) = self.repository().get_settings().await? {
            if let Some(key) = settings.chat_api_key {
                translator = translator.with_api_key(key);
            }
        }
        Ok(Arc::new(translator))
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.observability.log_level.clone()));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting Polydoc API Gateway v{}", polydoc_common::VERSION);

    // Initialize metrics
    metrics::register_metrics();
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()?;

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        ocr: None,
        translator: None,
    };

    // Build the router
    let app = create_router(state, config.server.max_upload_bytes);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // OCR task endpoints
        .route("/ocr/submit", post(handlers::ocr::submit))
        .route("/ocr/status", get(handlers::ocr::status))
        // Document downloads
        .route(
            "/documents/{task_id}/original",
            get(handlers::documents::download_original),
        )
        .route(
            "/documents/{task_id}/translated",
            get(handlers::documents::download_translated),
        )
        // Translation memory endpoints
        .route("/memory/upload", post(handlers::memory::upload))
        .route("/memory/assets", get(handlers::memory::list_assets))
        .route(
            "/memory/assets/{id}/records",
            get(handlers::memory::list_asset_records),
        )
        .route(
            "/memory/assets/{id}/export",
            get(handlers::memory::export_asset),
        )
        .route(
            "/memory/assets/{id}/duplicate",
            post(handlers::memory::duplicate_asset),
        )
        .route("/memory/assets/{id}", delete(handlers::memory::delete_asset))
        .route(
            "/memory",
            get(handlers::memory::list_memories)
                .put(handlers::memory::update_rows)
                .delete(handlers::memory::bulk_delete),
        )
        .route(
            "/memory/by-language",
            put(handlers::memory::update_rows_by_language),
        )
        .route("/memory/lookup", get(handlers::memory::lookup))
        // Machine translation
        .route("/translate/batch", post(handlers::translate::batch))
        // Settings
        .route(
            "/settings",
            get(handlers::settings::get_settings).put(handlers::settings::put_settings),
        );

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
