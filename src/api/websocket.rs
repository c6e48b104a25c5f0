//! WebSocket control channel for live tutoring sessions
//!
//! One connection is one session. The client streams base64 audio units and
//! ends the session explicitly; the server answers with status notices,
//! completed turns, and categorized errors.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::ApiState;
use crate::orchestrator::EndReason;
use crate::profile::CefrLevel;
use crate::turn::{Correction, PronunciationAssessment};

/// Incoming control-channel message from the client
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// One recorded utterance, base64-encoded
    Audio {
        #[serde(default)]
        audio: Option<String>,
    },
    /// Finish the session and persist it
    EndSession,
}

/// Outgoing control-channel message to the client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Human-readable progress notice
    Status {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        level: Option<CefrLevel>,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_number: Option<u64>,
    },
    /// Full result of one completed turn
    Conversation {
        timestamp: DateTime<Utc>,
        user: UserMessage,
        agent: AgentMessage,
    },
    /// Turn or decode failure; `audio_quality` is the one
    /// user-actionable category, everything else is `processing`
    Error { category: String, message: String },
}

/// Learner side of a conversation frame
#[derive(Debug, Serialize)]
pub struct UserMessage {
    pub original: String,
    pub corrected: String,
    pub translation: String,
    pub corrections: Vec<Correction>,
    pub pronunciation: PronunciationAssessment,
}

/// Tutor side of a conversation frame
#[derive(Debug, Serialize)]
pub struct AgentMessage {
    pub text: String,
    /// Base64 MP3, absent when synthesis failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

/// Build WebSocket router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/session", get(ws_upgrade))
        .with_state(state)
}

/// Handle WebSocket upgrade request
async fn ws_upgrade(State(state): State<Arc<ApiState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Decode one text frame from the client
///
/// A frame that does not decode yields the error notice to answer with;
/// it never reaches the session loop.
fn decode_frame(text: &str) -> Result<Inbound, Outbound> {
    serde_json::from_str(text).map_err(|e| {
        tracing::warn!(error = %e, "unrecognized client frame");
        Outbound::Error {
            category: "processing".to_string(),
            message: "invalid JSON message".to_string(),
        }
    })
}

/// Handle one WebSocket connection as one tutoring session
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let (mut sender, mut receiver) = socket.split();
    tracing::info!("WebSocket connected");

    // Channel for frames from the session loop back to the client
    let (tx, mut rx) = mpsc::channel::<Outbound>(32);

    // Forward outbound frames to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Decode client frames and hand them to the session loop
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<Inbound>(8);
    let decode_tx = tx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let delivered = match decode_frame(&text) {
                        Ok(frame) => inbound_tx.send(frame).await.is_ok(),
                        Err(notice) => decode_tx.send(notice).await.is_ok(),
                    };
                    if !delivered {
                        break;
                    }
                }
                Message::Close(_) => {
                    tracing::info!("WebSocket closed by client");
                    break;
                }
                _ => {}
            }
        }
    });

    let mut session = match state.lifecycle.open(tx.clone()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "failed to open session");
            let error = Outbound::Error {
                category: "processing".to_string(),
                message: format!("Could not start session: {e}"),
            };
            let _ = tx.send(error).await;
            drop(tx);
            recv_task.abort();
            let _ = send_task.await;
            return;
        }
    };

    // A disconnect mid-turn drops the serve future, abandoning the stage in
    // flight; finalization below runs on every path.
    let reason = tokio::select! {
        reason = session.serve(&mut inbound_rx) => reason,
        _ = &mut recv_task => EndReason::Disconnect,
    };

    state.lifecycle.finalize(session.finish(), reason);

    recv_task.abort();
    drop(tx);
    let _ = send_task.await;
    tracing::info!("WebSocket session closed");
}
