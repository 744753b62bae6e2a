use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::config::AppConfig;
use crate::db::{CopilotDb, DbHandle};

/// Build the full application router: API routes, JSON 404 fallback and
/// request tracing.
pub fn build_router(state: Arc<AppState>, cors_permissive: bool) -> Router {
    let mut app = api::api_router()
        .fallback(api::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// Open the database and build the shared state from `config`.
pub fn build_state(config: &AppConfig) -> Result<Arc<AppState>> {
    if let Some(parent) = config.database.path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db = CopilotDb::new(&config.database.path).context("Failed to initialize database")?;
    Ok(Arc::new(AppState::new(DbHandle::new(db), config)))
}

/// Start the HTTP server and run until Ctrl+C.
pub async fn start_server(config: &AppConfig) -> Result<()> {
    let problems = config.validate();
    for problem in &problems {
        warn!(problem = %problem, "Configuration problem");
    }
    if config.auth.jwt_secret.is_empty() {
        anyhow::bail!("auth.jwt_secret must be set before serving requests");
    }

    let state = build_state(config)?;
    let app = build_router(state, config.server.cors_permissive);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(
        address = %local_addr,
        database = %config.database.path.display(),
        "Maker Copilot listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C; shutting down");
        return;
    }
    info!("Shutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_router(cors: bool) -> Router {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "server-test-secret-0123456789abcdefgh".into();
        let db = CopilotDb::new_in_memory().unwrap();
        let state = Arc::new(AppState::new(DbHandle::new(db), &config));
        build_router(state, cors)
    }

    #[tokio::test]
    async fn test_health_through_full_router() {
        let response = test_router(false)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = test_router(false)
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Not found");
    }

    #[tokio::test]
    async fn test_cors_layer_when_permissive() {
        let request = || {
            Request::builder()
                .uri("/health")
                .header("origin", "http://localhost:5173")
                .body(Body::empty())
                .unwrap()
        };
        let response = test_router(true).oneshot(request()).await.unwrap();
        assert!(
            response
                .headers()
                .contains_key("access-control-allow-origin")
        );

        let response = test_router(false).oneshot(request()).await.unwrap();
        assert!(
            !response
                .headers()
                .contains_key("access-control-allow-origin")
        );
    }

    #[test]
    fn test_build_state_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database.path = dir.path().join("nested").join("copilot.db");
        build_state(&config).unwrap();
        assert!(config.database.path.exists());
    }
}
