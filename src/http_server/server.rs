//! # HTTP Server
//!
//! Main HTTP server combining the health and catalog routers.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::catalog_routes::{catalog_routes, CatalogBackend, CatalogState};
use super::config::HttpServerConfig;
use super::health_routes::health_routes;
use crate::config::AppConfig;

/// HTTP server for the catalog API
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server over `store` from the application config
    pub fn new<S: CatalogBackend>(config: &AppConfig, store: S) -> Self {
        let state = Arc::new(CatalogState::new(store, config.catalog.clone()));
        let router = Self::build_router(&config.server, state);
        Self {
            config: config.server.clone(),
            router,
        }
    }

    /// Build the combined router with all endpoints
    fn build_router<S: CatalogBackend>(
        config: &HttpServerConfig,
        state: Arc<CatalogState<S>>,
    ) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| match s.parse::<HeaderValue>() {
                    Ok(origin) => Some(origin),
                    Err(_) => {
                        warn!(origin = %s, "ignoring unparsable CORS origin");
                        None
                    }
                })
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .merge(health_routes())
            .merge(catalog_routes(state))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until Ctrl-C
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr = self
            .config
            .parse_socket_addr()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "catalog API listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_server_socket_addr() {
        let config = AppConfig::default();
        let server = HttpServer::new(&config, MemoryStore::new());
        assert_eq!(server.socket_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_router_builds_with_origins() {
        let mut config = AppConfig::default();
        config.server.cors_origins = vec!["http://localhost:5173".to_string()];
        let _router = HttpServer::new(&config, MemoryStore::new()).router();
    }
}
