//! HTTP and WebSocket API server

pub mod health;
pub mod profile;
pub mod sessions;
pub mod voice;
pub mod websocket;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::gateway::ServiceGateway;
use crate::lifecycle::SessionLifecycle;
use crate::profile::ProfileStore;
use crate::session::SessionStore;
use crate::{Error, Result};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub lifecycle: SessionLifecycle,
    pub profile_store: ProfileStore,
    pub session_store: SessionStore,
    pub gateway: ServiceGateway,
}

/// Build the application router with all routes
#[must_use]
pub fn build_router(state: Arc<ApiState>) -> Router {
    let router = Router::new()
        .nest("/api/profile", profile::router(state.clone()))
        .nest("/api/sessions", sessions::router(state.clone()))
        .nest("/ws", websocket::router(state.clone()))
        .merge(health::router(state.clone()))
        .merge(voice::router(state));

    // CORS for the browser frontend served separately
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server from shared state
    #[must_use]
    pub fn new(state: ApiState, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            port,
        }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, build_router(self.state))
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}
