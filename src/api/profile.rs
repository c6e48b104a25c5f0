//! Learner profile routes

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;

use super::ApiState;
use crate::profile::LearnerProfile;

/// Response to a profile update
#[derive(Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub profile: LearnerProfile,
}

/// Build profile router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(get_profile))
        .route("/update", post(update_profile))
        .with_state(state)
}

/// Current learner profile
async fn get_profile(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<LearnerProfile>, (StatusCode, String)> {
    state
        .profile_store
        .load_or_default()
        .map(Json)
        .map_err(internal_error)
}

/// Merge a partial update into the profile and persist it
async fn update_profile(
    State(state): State<Arc<ApiState>>,
    Json(updates): Json<serde_json::Value>,
) -> Result<Json<UpdateResponse>, (StatusCode, String)> {
    let mut profile = state
        .profile_store
        .load_or_default()
        .map_err(internal_error)?;

    profile
        .merge(&updates)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    state.profile_store.save(&profile).map_err(internal_error)?;

    tracing::info!(learner = %profile.name, "profile updated via API");
    Ok(Json(UpdateResponse {
        success: true,
        profile,
    }))
}

fn internal_error(e: crate::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
