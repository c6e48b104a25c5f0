//! Health check endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;
use crate::profile::CefrLevel;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub learner: LearnerSummary,
}

/// Learner identity block in the health response
#[derive(Serialize)]
pub struct LearnerSummary {
    pub name: String,
    pub level: CefrLevel,
    pub sessions: u64,
}

/// Build health router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .with_state(state)
}

/// Liveness probe with a learner summary
async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let profile = state.profile_store.load_or_default().unwrap_or_default();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        learner: LearnerSummary {
            name: profile.name,
            level: profile.current_level,
            sessions: profile.session_count,
        },
    })
}
