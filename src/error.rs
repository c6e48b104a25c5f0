//! Error types for the parlando server

use thiserror::Error;

/// Result type alias for parlando operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the parlando server
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Input audio was unusable (too short or empty transcript).
    /// User-actionable: the client should prompt for a re-record.
    #[error("audio quality error: {0}")]
    AudioQuality(String),

    /// Speech-to-text service failure
    #[error("STT error: {0}")]
    Stt(String),

    /// Dialogue generation service failure
    #[error("dialogue error: {0}")]
    Dialogue(String),

    /// Text-to-speech service failure
    #[error("TTS error: {0}")]
    Tts(String),

    /// Profile or session storage failure
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Session not found
    #[error("not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error should be reported to the client as `audio_quality`,
    /// the one category a user can act on by re-recording.
    #[must_use]
    pub const fn is_audio_quality(&self) -> bool {
        matches!(self, Self::AudioQuality(_))
    }
}
