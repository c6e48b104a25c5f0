//! TOML configuration file loading
//!
//! Supports `~/.config/parlando/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ParlandoConfigFile {
    /// Server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Storage locations
    #[serde(default)]
    pub storage: StorageFileConfig,

    /// Tutoring behaviour
    #[serde(default)]
    pub tutor: TutorFileConfig,

    /// Dialogue model configuration
    #[serde(default)]
    pub dialogue: DialogueFileConfig,

    /// Speech-to-text configuration
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Text-to-speech configuration
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// External-call behaviour
    #[serde(default)]
    pub gateway: GatewayFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Port to listen on
    pub port: Option<u16>,
}

/// Storage locations
#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    /// Data directory holding the profile file and `sessions/`
    pub data_dir: Option<String>,
}

/// Tutoring behaviour
#[derive(Debug, Default, Deserialize)]
pub struct TutorFileConfig {
    /// ISO language hint passed to transcription (e.g. "de")
    pub language: Option<String>,

    /// Human-readable language name used in the system instruction (e.g. "German")
    pub language_name: Option<String>,

    /// Persist a session snapshot every N exchanges
    pub checkpoint_interval: Option<usize>,

    /// Number of prior exchanges supplied as dialogue context
    pub context_window: Option<usize>,

    /// Transcripts shorter than this count as unusable audio
    pub min_transcript_chars: Option<usize>,
}

/// Dialogue model configuration
#[derive(Debug, Default, Deserialize)]
pub struct DialogueFileConfig {
    /// Model identifier (e.g. "gpt-4-turbo-preview")
    pub model: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f64>,

    /// Max tokens per reply
    pub max_tokens: Option<u32>,
}

/// Speech-to-text configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// STT model (e.g. "whisper-1")
    pub model: Option<String>,
}

/// Text-to-speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// TTS model (e.g. "tts-1")
    pub model: Option<String>,

    /// TTS voice identifier (e.g. "nova")
    pub voice: Option<String>,

    /// TTS speed multiplier
    pub speed: Option<f64>,
}

/// External-call behaviour
#[derive(Debug, Default, Deserialize)]
pub struct GatewayFileConfig {
    /// Per-stage timeout for external calls, in seconds
    pub timeout_secs: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ParlandoConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> ParlandoConfigFile {
    let Some(path) = config_file_path() else {
        return ParlandoConfigFile::default();
    };

    load_config_file_from(&path)
}

/// Load a TOML config file from an explicit path
///
/// Returns `ParlandoConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file_from(path: &Path) -> ParlandoConfigFile {
    if !path.exists() {
        return ParlandoConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ParlandoConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ParlandoConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/parlando/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("parlando").join("config.toml"))
}
