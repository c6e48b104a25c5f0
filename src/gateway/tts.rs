//! OpenAI speech synthesis

use async_trait::async_trait;

use crate::config::TtsConfig;
use crate::gateway::SpeechSynthesizer;
use crate::{Error, Result};

/// Renders tutor replies as MP3 audio via the OpenAI TTS API
#[derive(Debug)]
pub struct OpenAISynthesizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    voice: String,
    speed: f64,
}

impl OpenAISynthesizer {
    /// Create a synthesizer with the configured voice profile
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, config: &TtsConfig) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone(),
            voice: config.voice.clone(),
            speed: config.speed,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            response_format: &'a str,
            speed: f64,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "mp3",
            speed: self.speed,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "TTS API error");
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(
            audio_bytes = audio.len(),
            text_len = text.len(),
            "synthesis complete"
        );
        Ok(audio.to_vec())
    }
}
