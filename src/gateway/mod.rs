//! External speech and dialogue services
//!
//! Three narrow async contracts sit between the conversation loop and the
//! network: transcription, dialogue generation, and speech synthesis. The
//! [`ServiceGateway`] bundles one provider per contract and applies the
//! configured per-call time limit uniformly.

pub mod dialogue;
pub mod stt;
pub mod tts;

pub use dialogue::ChatDialogue;
pub use stt::WhisperTranscriber;
pub use tts::OpenAISynthesizer;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::context::ContextPair;
use crate::{Error, Result};

/// Trait for turning learner audio into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe recorded audio
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// Trait for generating the tutor's next turn
///
/// Returns the model's raw text output. Interpreting that text as a
/// structured turn is the caller's concern.
#[async_trait]
pub trait DialogueModel: Send + Sync {
    /// Generate a reply for the given request
    ///
    /// # Errors
    ///
    /// Returns error if generation fails
    async fn generate(&self, request: &DialogueRequest) -> Result<String>;
}

/// Trait for rendering tutor replies as speech
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize text to audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// One dialogue-model call: instruction, recent pairs, and the new input
#[derive(Debug, Clone)]
pub struct DialogueRequest {
    /// System instruction built from the learner profile
    pub system_instruction: String,
    /// Recent completed exchanges, oldest first
    pub context: Vec<ContextPair>,
    /// The learner's latest transcribed utterance
    pub user_text: String,
}

/// Bundles the three external services behind one timeout policy
#[derive(Clone)]
pub struct ServiceGateway {
    transcriber: Arc<dyn Transcriber>,
    dialogue: Arc<dyn DialogueModel>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    timeout: Duration,
}

impl std::fmt::Debug for ServiceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceGateway")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ServiceGateway {
    /// Create a gateway from explicit providers
    #[must_use]
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        dialogue: Arc<dyn DialogueModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        timeout: Duration,
    ) -> Self {
        Self {
            transcriber,
            dialogue,
            synthesizer,
            timeout,
        }
    }

    /// Create a gateway backed by the OpenAI providers
    ///
    /// # Errors
    ///
    /// Returns error if no API key is configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_keys.openai.clone().ok_or_else(|| {
            Error::Config(
                "OpenAI API key not set; export OPENAI_API_KEY or run `parlando setup`"
                    .to_string(),
            )
        })?;

        let transcriber = WhisperTranscriber::new(
            api_key.clone(),
            config.stt.model.clone(),
            config.tutor.language.clone(),
            &config.tutor.language_name,
        )?;
        let dialogue = ChatDialogue::new(api_key.clone(), &config.dialogue)?;
        let synthesizer = OpenAISynthesizer::new(api_key, &config.tts)?;

        Ok(Self::new(
            Arc::new(transcriber),
            Arc::new(dialogue),
            Arc::new(synthesizer),
            config.gateway.timeout(),
        ))
    }

    /// Transcribe learner audio, bounded by the configured time limit
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails or times out
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.transcriber.transcribe(audio)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Stt(format!(
                "transcription timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    /// Generate the tutor's next turn, bounded by the configured time limit
    ///
    /// # Errors
    ///
    /// Returns error if generation fails or times out
    pub async fn generate(&self, request: &DialogueRequest) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.dialogue.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Dialogue(format!(
                "dialogue generation timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    /// Synthesize a tutor reply, bounded by the configured time limit
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails or times out
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        match tokio::time::timeout(self.timeout, self.synthesizer.synthesize(text)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Tts(format!(
                "speech synthesis timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowTranscriber;

    #[async_trait]
    impl Transcriber for SlowTranscriber {
        async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    struct EchoDialogue;

    #[async_trait]
    impl DialogueModel for EchoDialogue {
        async fn generate(&self, request: &DialogueRequest) -> Result<String> {
            Ok(request.user_text.clone())
        }
    }

    struct SilentSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for SilentSynthesizer {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn gateway(timeout: Duration) -> ServiceGateway {
        ServiceGateway::new(
            Arc::new(SlowTranscriber),
            Arc::new(EchoDialogue),
            Arc::new(SilentSynthesizer),
            timeout,
        )
    }

    #[tokio::test]
    async fn stalled_transcription_times_out() {
        let gateway = gateway(Duration::from_millis(20));
        let err = gateway.transcribe(b"audio").await.unwrap_err();
        assert!(matches!(err, Error::Stt(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let gateway = gateway(Duration::from_secs(5));
        let request = DialogueRequest {
            system_instruction: String::new(),
            context: Vec::new(),
            user_text: "hallo".to_string(),
        };
        assert_eq!(gateway.generate(&request).await.unwrap(), "hallo");
    }
}
