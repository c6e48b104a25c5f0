//! Configuration management for the parlando server

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, resolved from env vars, the TOML config file,
/// and compiled defaults (in that precedence order).
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Storage locations
    pub storage: StorageConfig,

    /// Tutoring behaviour
    pub tutor: TutorConfig,

    /// Dialogue model configuration
    pub dialogue: DialogueConfig,

    /// Speech-to-text configuration
    pub stt: SttConfig,

    /// Text-to-speech configuration
    pub tts: TtsConfig,

    /// External-call behaviour
    pub gateway: GatewayConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// HTTP/WebSocket server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
}

/// Storage locations
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Data directory holding the profile file and session records
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// Path of the learner profile file
    #[must_use]
    pub fn profile_path(&self) -> PathBuf {
        self.data_dir.join("learner_profile.json")
    }

    /// Directory holding per-session checkpoint files
    #[must_use]
    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }
}

/// Tutoring behaviour
#[derive(Debug, Clone)]
pub struct TutorConfig {
    /// ISO language hint passed to transcription (e.g. "de")
    pub language: String,

    /// Human-readable language name used in the system instruction
    pub language_name: String,

    /// Persist a session snapshot every N exchanges
    pub checkpoint_interval: usize,

    /// Number of prior exchanges supplied as dialogue context
    pub context_window: usize,

    /// Transcripts shorter than this count as unusable audio
    pub min_transcript_chars: usize,
}

/// Dialogue model configuration
#[derive(Debug, Clone)]
pub struct DialogueConfig {
    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Max tokens per reply
    pub max_tokens: u32,
}

/// Speech-to-text configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// STT model identifier
    pub model: String,
}

/// Text-to-speech configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// TTS model identifier
    pub model: String,

    /// Voice identifier
    pub voice: String,

    /// Speed multiplier (0.25 to 4.0)
    pub speed: f64,
}

/// External-call behaviour
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Per-stage timeout for external calls, in seconds
    pub timeout_secs: u64,
}

impl GatewayConfig {
    /// Per-stage timeout as a [`Duration`]
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper, chat completions, and TTS)
    pub openai: Option<String>,
}

impl Config {
    /// Load configuration from env vars, the standard config file, and defaults
    #[must_use]
    pub fn load() -> Self {
        Self::from_overlay(file::load_config_file())
    }

    /// Load configuration using an explicit config file path
    #[must_use]
    pub fn load_from(path: &std::path::Path) -> Self {
        Self::from_overlay(file::load_config_file_from(path))
    }

    /// Resolve the full configuration from a TOML overlay (env > toml > default)
    fn from_overlay(fc: file::ParlandoConfigFile) -> Self {
        let server = ServerConfig {
            port: std::env::var("PARLANDO_PORT")
                .or_else(|_| std::env::var("PORT"))
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(8765),
        };

        let storage = StorageConfig {
            data_dir: std::env::var("PARLANDO_DATA_DIR")
                .ok()
                .map(PathBuf::from)
                .or_else(|| fc.storage.data_dir.map(PathBuf::from))
                .unwrap_or_else(default_data_dir),
        };

        let tutor = TutorConfig {
            language: std::env::var("PARLANDO_LANGUAGE")
                .ok()
                .or(fc.tutor.language)
                .unwrap_or_else(|| "de".to_string()),
            language_name: std::env::var("PARLANDO_LANGUAGE_NAME")
                .ok()
                .or(fc.tutor.language_name)
                .unwrap_or_else(|| "German".to_string()),
            checkpoint_interval: fc.tutor.checkpoint_interval.unwrap_or(3),
            context_window: fc.tutor.context_window.unwrap_or(8),
            min_transcript_chars: fc.tutor.min_transcript_chars.unwrap_or(3),
        };

        let dialogue = DialogueConfig {
            model: std::env::var("PARLANDO_DIALOGUE_MODEL")
                .ok()
                .or(fc.dialogue.model)
                .unwrap_or_else(|| "gpt-4-turbo-preview".to_string()),
            temperature: fc.dialogue.temperature.unwrap_or(0.7),
            max_tokens: fc.dialogue.max_tokens.unwrap_or(2000),
        };

        let stt = SttConfig {
            model: std::env::var("PARLANDO_STT_MODEL")
                .ok()
                .or(fc.stt.model)
                .unwrap_or_else(|| "whisper-1".to_string()),
        };

        let tts = TtsConfig {
            model: std::env::var("PARLANDO_TTS_MODEL")
                .ok()
                .or(fc.tts.model)
                .unwrap_or_else(|| "tts-1".to_string()),
            voice: std::env::var("PARLANDO_TTS_VOICE")
                .ok()
                .or(fc.tts.voice)
                .unwrap_or_else(|| "nova".to_string()),
            speed: fc.tts.speed.unwrap_or(0.9),
        };

        let gateway = GatewayConfig {
            timeout_secs: std::env::var("PARLANDO_GATEWAY_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.gateway.timeout_secs)
                .unwrap_or(60),
        };

        let api_keys = ApiKeys {
            openai: std::env::var("OPENAI_API_KEY").ok().or(fc.api_keys.openai),
        };

        Self {
            server,
            storage,
            tutor,
            dialogue,
            stt,
            tts,
            gateway,
            api_keys,
        }
    }
}

/// Default data directory: `~/.local/share/parlando` on Linux
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".parlando"),
        |d| d.data_dir().join("parlando"),
    )
}
