//! HTTP API.
//!
//! All dengue endpoints live under `/api/dengue` and are read-only.

pub mod handlers;
pub mod response;

use crate::config::ServerConfig;
use crate::engine::StatsEngine;
use anyhow::{Context, Result};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<StatsEngine>,
}

/// Build the application router.
///
/// A CORS layer is installed only when `cors_origin` is set.
pub fn router(state: AppState, cors_origin: Option<&str>) -> Result<Router> {
    let dengue = Router::new()
        .route("/stats", get(handlers::stats))
        .route("/cases-by-year", get(handlers::cases_by_year))
        .route("/cases-by-province", get(handlers::cases_by_province))
        .route("/trends", get(handlers::trends))
        .route("/high-risk-areas", get(handlers::high_risk_areas))
        .route("/case-details", get(handlers::case_details))
        .route("/chart-data", get(handlers::chart_data));

    let mut app = Router::new()
        .nest("/api/dengue", dengue)
        .route("/api/health", get(handlers::health))
        .fallback(handlers::not_found)
        .with_state(state);

    if let Some(origin) = cors_origin {
        let origin: HeaderValue = origin
            .parse()
            .with_context(|| format!("Invalid CORS origin: {}", origin))?;

        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(60 * 60));

        app = app.layer(cors);
    }

    Ok(app)
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: &ServerConfig, engine: StatsEngine) -> Result<()> {
    let state = AppState {
        engine: Arc::new(engine),
    };
    let app = router(state, config.cors_origin.as_deref())?;

    let address = format!("{}:{}", config.host, config.port);
    info!("Binding to {}", address);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
