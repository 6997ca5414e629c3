use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::state::AppState;
use crate::ws;

/// Build the HTTP router: the vote socket at `/ws`, static files for everything else
pub fn router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .fallback_service(static_files)
        // Every origin is accepted; participants are trusted
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Address the listener binds to: all interfaces on the configured port
pub fn listen_addr(port: u16) -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], port))
}

/// Serve the hub on an already-bound listener until the server stops
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: Arc<AppState>,
) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state_serving(dir: &std::path::Path) -> Arc<AppState> {
        let config = HubConfig {
            static_dir: dir.to_path_buf(),
            ..HubConfig::default()
        };
        Arc::new(AppState::new(config))
    }

    #[tokio::test]
    async fn test_serves_static_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Jury</h1>").unwrap();

        let response = router(state_serving(dir.path()))
            .oneshot(Request::get("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_static_file_is_404() {
        let dir = tempfile::tempdir().unwrap();

        let response = router(state_serving(dir.path()))
            .oneshot(Request::get("/nope.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ws_route_rejects_plain_get() {
        let dir = tempfile::tempdir().unwrap();

        let response = router(state_serving(dir.path()))
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[test]
    fn test_listen_addr_binds_all_interfaces() {
        assert_eq!(listen_addr(8080).to_string(), "0.0.0.0:8080");
    }
}
