pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use config::Config;
use models::predict_types::AUDIO_ROUTE;
use services::classifier::model_manager::ModelManager;
use services::predictor::Predictor;
use services::upload_store::UploadStore;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    pub predict_timeout: Option<Duration>,
}

pub fn build_router(state: AppState, config: &Config) -> anyhow::Result<Router> {
    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim())
                .with_context(|| format!("Invalid CORS origin {:?}", origin))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    Ok(Router::new()
        .route("/", get(commands::health::read_root))
        .route("/uploadfile", post(commands::upload::upload_file))
        .nest_service(AUDIO_ROUTE, ServeDir::new(&config.audio_dir))
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Load everything the service needs, then serve until Ctrl-C.
///
/// The classifier is loaded before the listener binds, so a broken model
/// keeps the service from accepting requests at all.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let categories = Arc::new(
        config
            .load_categories()
            .context("Failed to load the category table")?,
    );

    let store = UploadStore::new(&config.upload_dir);
    store
        .ensure_dir()
        .await
        .context("Failed to prepare the upload directory")?;

    let models = Arc::new(ModelManager::from_artifacts(
        config.model_artifacts(),
        categories.len(),
    ));
    models
        .get()
        .await
        .context("Failed to load the classifier")?;

    let state = AppState {
        predictor: Arc::new(Predictor::new(store, models, categories)),
        predict_timeout: config.predict_timeout(),
    };
    let app = build_router(state, &config)?;

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
