//! Interactive first-run setup wizard (`parlando setup`)

use std::path::PathBuf;

use dialoguer::{Input, Select};

use crate::config::file::{
    ApiKeysFileConfig, ParlandoConfigFile, ServerFileConfig, TtsFileConfig, TutorFileConfig,
};

/// Practice languages offered by the wizard, as (display name, ISO code)
const LANGUAGES: [(&str, &str); 6] = [
    ("German", "de"),
    ("French", "fr"),
    ("Spanish", "es"),
    ("Italian", "it"),
    ("Portuguese", "pt"),
    ("Dutch", "nl"),
];

/// OpenAI TTS voices
const VOICES: [&str; 6] = ["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("Parlando Setup\n");

    // Load existing config if present
    let existing = crate::config::file::load_config_file();
    let config_path = crate::config::file::config_file_path()
        .unwrap_or_else(|| PathBuf::from("~/.config/parlando/config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. OpenAI API key (Whisper, dialogue, and TTS all go through it)
    let existing_key = existing.api_keys.openai.as_deref();
    let masked = existing_key.map(|k| {
        if k.len() > 8 {
            format!("{}...{}", &k[..4], &k[k.len() - 4..])
        } else {
            "****".to_string()
        }
    });

    let prompt = if let Some(ref m) = masked {
        format!("OpenAI API key (current: {m}, leave blank to keep)")
    } else {
        "OpenAI API key (OPENAI_API_KEY)".to_string()
    };

    let api_key_input: String = Input::new()
        .with_prompt(&prompt)
        .allow_empty(true)
        .interact_text()?;

    let api_key = if api_key_input.is_empty() {
        existing_key.map(str::to_string)
    } else {
        Some(api_key_input)
    };

    // 2. Practice language
    let language_labels: Vec<&str> = LANGUAGES.iter().map(|(name, _)| *name).collect();
    let default_language = existing
        .tutor
        .language
        .as_deref()
        .and_then(|code| LANGUAGES.iter().position(|(_, c)| *c == code))
        .unwrap_or(0);

    let language_idx = Select::new()
        .with_prompt("Practice language")
        .items(&language_labels)
        .default(default_language)
        .interact()?;
    let (language_name, language_code) = LANGUAGES[language_idx];

    // 3. Tutor voice
    let default_voice = existing
        .tts
        .voice
        .as_deref()
        .and_then(|v| VOICES.iter().position(|&l| l == v))
        .unwrap_or(4); // nova

    let voice_idx = Select::new()
        .with_prompt("Tutor voice")
        .items(&VOICES)
        .default(default_voice)
        .interact()?;
    let voice = VOICES[voice_idx].to_string();

    // 4. Server port
    let port: u16 = Input::new()
        .with_prompt("Server port")
        .default(existing.server.port.unwrap_or(8765))
        .interact_text()?;

    // 5. Build and write config, carrying unprompted sections through
    let config_file = ParlandoConfigFile {
        server: ServerFileConfig { port: Some(port) },
        storage: existing.storage,
        tutor: TutorFileConfig {
            language: Some(language_code.to_string()),
            language_name: Some(language_name.to_string()),
            checkpoint_interval: existing.tutor.checkpoint_interval,
            context_window: existing.tutor.context_window,
            min_transcript_chars: existing.tutor.min_transcript_chars,
        },
        dialogue: existing.dialogue,
        stt: existing.stt,
        tts: TtsFileConfig {
            model: existing.tts.model,
            voice: Some(voice),
            speed: existing.tts.speed,
        },
        gateway: existing.gateway,
        api_keys: ApiKeysFileConfig { openai: api_key },
    };

    write_config(&config_path, &config_file)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `parlando` to start the server.");

    Ok(())
}

/// Serialize and write the config file
fn write_config(path: &PathBuf, config: &ParlandoConfigFile) -> anyhow::Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml = serialize_config(config);
    std::fs::write(path, toml)?;

    Ok(())
}

/// Serialize config to a readable TOML string
fn serialize_config(config: &ParlandoConfigFile) -> String {
    let mut out = String::new();

    // [server]
    if let Some(port) = config.server.port {
        out.push_str("[server]\n");
        out.push_str(&format!("port = {port}\n"));
        out.push('\n');
    }

    // [storage]
    if let Some(ref dir) = config.storage.data_dir {
        out.push_str("[storage]\n");
        out.push_str(&format!("data_dir = \"{dir}\"\n"));
        out.push('\n');
    }

    // [tutor]
    let tu = &config.tutor;
    if tu.language.is_some()
        || tu.language_name.is_some()
        || tu.checkpoint_interval.is_some()
        || tu.context_window.is_some()
        || tu.min_transcript_chars.is_some()
    {
        out.push_str("[tutor]\n");
        if let Some(ref code) = tu.language {
            out.push_str(&format!("language = \"{code}\"\n"));
        }
        if let Some(ref name) = tu.language_name {
            out.push_str(&format!("language_name = \"{name}\"\n"));
        }
        if let Some(n) = tu.checkpoint_interval {
            out.push_str(&format!("checkpoint_interval = {n}\n"));
        }
        if let Some(n) = tu.context_window {
            out.push_str(&format!("context_window = {n}\n"));
        }
        if let Some(n) = tu.min_transcript_chars {
            out.push_str(&format!("min_transcript_chars = {n}\n"));
        }
        out.push('\n');
    }

    // [dialogue]
    let dl = &config.dialogue;
    if dl.model.is_some() || dl.temperature.is_some() || dl.max_tokens.is_some() {
        out.push_str("[dialogue]\n");
        if let Some(ref m) = dl.model {
            out.push_str(&format!("model = \"{m}\"\n"));
        }
        if let Some(t) = dl.temperature {
            out.push_str(&format!("temperature = {t}\n"));
        }
        if let Some(n) = dl.max_tokens {
            out.push_str(&format!("max_tokens = {n}\n"));
        }
        out.push('\n');
    }

    // [stt]
    if let Some(ref m) = config.stt.model {
        out.push_str("[stt]\n");
        out.push_str(&format!("model = \"{m}\"\n"));
        out.push('\n');
    }

    // [tts]
    let tt = &config.tts;
    if tt.model.is_some() || tt.voice.is_some() || tt.speed.is_some() {
        out.push_str("[tts]\n");
        if let Some(ref m) = tt.model {
            out.push_str(&format!("model = \"{m}\"\n"));
        }
        if let Some(ref v) = tt.voice {
            out.push_str(&format!("voice = \"{v}\"\n"));
        }
        if let Some(s) = tt.speed {
            out.push_str(&format!("speed = {s}\n"));
        }
        out.push('\n');
    }

    // [gateway]
    if let Some(secs) = config.gateway.timeout_secs {
        out.push_str("[gateway]\n");
        out.push_str(&format!("timeout_secs = {secs}\n"));
        out.push('\n');
    }

    // [api_keys]
    if let Some(ref key) = config.api_keys.openai {
        out.push_str("[api_keys]\n");
        out.push_str(&format!("openai = \"{key}\"\n"));
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::{DialogueFileConfig, GatewayFileConfig, StorageFileConfig};

    #[test]
    fn serialized_config_round_trips() {
        let config = ParlandoConfigFile {
            server: ServerFileConfig { port: Some(9000) },
            storage: StorageFileConfig {
                data_dir: Some("/tmp/parlando".to_string()),
            },
            tutor: TutorFileConfig {
                language: Some("fr".to_string()),
                language_name: Some("French".to_string()),
                checkpoint_interval: Some(5),
                context_window: None,
                min_transcript_chars: None,
            },
            dialogue: DialogueFileConfig {
                model: Some("gpt-4-turbo-preview".to_string()),
                temperature: Some(0.7),
                max_tokens: None,
            },
            stt: Default::default(),
            tts: TtsFileConfig {
                model: None,
                voice: Some("shimmer".to_string()),
                speed: Some(0.9),
            },
            gateway: GatewayFileConfig {
                timeout_secs: Some(30),
            },
            api_keys: ApiKeysFileConfig {
                openai: Some("sk-test".to_string()),
            },
        };

        let parsed: ParlandoConfigFile = toml::from_str(&serialize_config(&config)).unwrap();

        assert_eq!(parsed.server.port, Some(9000));
        assert_eq!(parsed.storage.data_dir.as_deref(), Some("/tmp/parlando"));
        assert_eq!(parsed.tutor.language.as_deref(), Some("fr"));
        assert_eq!(parsed.tutor.language_name.as_deref(), Some("French"));
        assert_eq!(parsed.tutor.checkpoint_interval, Some(5));
        assert_eq!(parsed.dialogue.temperature, Some(0.7));
        assert_eq!(parsed.tts.voice.as_deref(), Some("shimmer"));
        assert_eq!(parsed.tts.speed, Some(0.9));
        assert_eq!(parsed.gateway.timeout_secs, Some(30));
        assert_eq!(parsed.api_keys.openai.as_deref(), Some("sk-test"));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let serialized = serialize_config(&ParlandoConfigFile::default());
        assert!(serialized.is_empty());
    }
}
