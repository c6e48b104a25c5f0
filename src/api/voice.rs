//! Speech synthesis debug route

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;

use super::ApiState;

/// Sentence spoken by the synthesis check
const TEST_SENTENCE: &str = "Hallo, wie geht es dir?";

/// Result of the synthesis check
#[derive(Serialize)]
pub struct TtsTestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_size: Option<usize>,
    /// First 100 base64 characters, enough to eyeball the payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/test-tts", get(test_tts))
        .with_state(state)
}

/// Synthesize a fixed sentence to verify TTS connectivity
async fn test_tts(State(state): State<Arc<ApiState>>) -> Json<TtsTestResponse> {
    match state.gateway.synthesize(TEST_SENTENCE).await {
        Ok(audio) => Json(TtsTestResponse {
            success: true,
            text: Some(TEST_SENTENCE),
            audio_size: Some(audio.len()),
            sample: Some(BASE64.encode(&audio).chars().take(100).collect()),
            error: None,
        }),
        Err(e) => {
            tracing::error!(error = %e, "TTS test failed");
            Json(TtsTestResponse {
                success: false,
                text: None,
                audio_size: None,
                sample: None,
                error: Some(e.to_string()),
            })
        }
    }
}
