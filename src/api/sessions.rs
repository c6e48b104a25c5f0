//! Session record routes
//!
//! Read-only views over the checkpoint files plus deletion by filename.
//! These routes tolerate partially-written or malformed files the same way
//! the store does: by skipping them.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ApiState;
use crate::Error;
use crate::profile::CefrLevel;
use crate::session::{SessionRecord, SessionStore, SessionSummary};

/// Session listing response
#[derive(Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionSummary>,
}

/// Response to a session deletion
#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted: String,
}

/// Metadata stub for a session about to start
#[derive(Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub learner_level: CefrLevel,
    pub session_number: u64,
}

/// Build sessions router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(list_sessions))
        .route("/new", post(new_session))
        .route("/{key}", get(get_session).delete(delete_session))
        .with_state(state)
}

/// All stored sessions, newest first
async fn list_sessions(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<SessionList>, (StatusCode, String)> {
    let sessions = state.session_store.list().map_err(internal_error)?;
    Ok(Json(SessionList { sessions }))
}

/// Full session record by session identifier
async fn get_session(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionRecord>, (StatusCode, String)> {
    state
        .session_store
        .find(&session_id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "session not found".to_string()))
}

/// Delete one checkpoint file by name
///
/// Only the name-format guard is the client's fault; a failed unlink on a
/// well-formed name is a server error.
async fn delete_session(
    State(state): State<Arc<ApiState>>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteResponse>, (StatusCode, String)> {
    if !SessionStore::is_valid_file_name(&filename) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("invalid session filename: {filename}"),
        ));
    }

    match state.session_store.delete(&filename) {
        Ok(()) => Ok(Json(DeleteResponse {
            success: true,
            deleted: filename,
        })),
        Err(e @ Error::NotFound(_)) => Err((StatusCode::NOT_FOUND, e.to_string())),
        Err(e) => Err(internal_error(e)),
    }
}

/// Identity a session would get if it started now
async fn new_session(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<NewSessionResponse>, (StatusCode, String)> {
    let profile = state
        .profile_store
        .load_or_default()
        .map_err(internal_error)?;
    let start = Utc::now();

    Ok(Json(NewSessionResponse {
        session_id: SessionRecord::id_for(start),
        start_time: start,
        learner_level: profile.current_level,
        session_number: profile.session_count + 1,
    }))
}

fn internal_error(e: Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
