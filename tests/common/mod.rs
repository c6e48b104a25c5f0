//! Shared test utilities: scripted gateway providers and tempdir-backed stores

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use parlando::Result;
use parlando::config::TutorConfig;
use parlando::gateway::{
    DialogueModel, DialogueRequest, ServiceGateway, SpeechSynthesizer, Transcriber,
};
use parlando::lifecycle::SessionLifecycle;
use parlando::profile::ProfileStore;
use parlando::session::SessionStore;

/// Transcript produced once a scripted transcriber runs out of entries
pub const DEFAULT_TRANSCRIPT: &str = "Ich habe gestern Fußball gespielt";

/// Well-formed dialogue output produced once a scripted dialogue runs out
pub const DEFAULT_TURN_JSON: &str = r#"{
    "corrected": "Ich habe gestern Fußball gespielt.",
    "translation": "I played football yesterday.",
    "corrections": [],
    "pronunciation": {"quality": "clear", "issue": null},
    "reply": "Super! Hat dein Team gewonnen?"
}"#;

/// Transcriber that pops scripted results, then repeats the default transcript
pub struct ScriptedTranscriber {
    script: Mutex<Vec<Result<String>>>,
}

impl ScriptedTranscriber {
    pub fn new(script: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(script),
        }
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        let mut script = self.script.lock().expect("script lock");
        if script.is_empty() {
            Ok(DEFAULT_TRANSCRIPT.to_string())
        } else {
            script.remove(0)
        }
    }
}

/// Dialogue model that records every request and pops scripted raw outputs
pub struct ScriptedDialogue {
    script: Mutex<Vec<Result<String>>>,
    requests: Mutex<Vec<DialogueRequest>>,
}

impl ScriptedDialogue {
    pub fn new(script: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far, in call order
    pub fn requests(&self) -> Vec<DialogueRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl DialogueModel for ScriptedDialogue {
    async fn generate(&self, request: &DialogueRequest) -> Result<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        let mut script = self.script.lock().expect("script lock");
        if script.is_empty() {
            Ok(DEFAULT_TURN_JSON.to_string())
        } else {
            script.remove(0)
        }
    }
}

/// Synthesizer that pops scripted results, then repeats a fixed byte pattern
pub struct ScriptedSynthesizer {
    script: Mutex<Vec<Result<Vec<u8>>>>,
}

impl ScriptedSynthesizer {
    pub fn new(script: Vec<Result<Vec<u8>>>) -> Self {
        Self {
            script: Mutex::new(script),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        let mut script = self.script.lock().expect("script lock");
        if script.is_empty() {
            Ok(vec![0x49, 0x44, 0x33, 0x04])
        } else {
            script.remove(0)
        }
    }
}

/// Tutor settings used across the integration tests
pub fn tutor_config() -> TutorConfig {
    TutorConfig {
        language: "de".to_string(),
        language_name: "German".to_string(),
        checkpoint_interval: 3,
        context_window: 8,
        min_transcript_chars: 3,
    }
}

/// A lifecycle wired to scripted providers and tempdir-backed stores
pub struct TestHarness {
    pub lifecycle: SessionLifecycle,
    pub profile_store: ProfileStore,
    pub session_store: SessionStore,
    pub gateway: ServiceGateway,
    pub dialogue: Arc<ScriptedDialogue>,
    /// Owns the on-disk stores for the duration of the test
    pub data_dir: TempDir,
}

/// Build a harness; empty scripts mean every call succeeds with defaults
pub fn harness(
    transcripts: Vec<Result<String>>,
    turns: Vec<Result<String>>,
    synth: Vec<Result<Vec<u8>>>,
) -> TestHarness {
    let data_dir = tempfile::tempdir().expect("create tempdir");
    let profile_store = ProfileStore::new(data_dir.path().join("learner_profile.json"));
    let session_store = SessionStore::new(data_dir.path().join("sessions"));

    let dialogue = Arc::new(ScriptedDialogue::new(turns));
    let gateway = ServiceGateway::new(
        Arc::new(ScriptedTranscriber::new(transcripts)),
        dialogue.clone(),
        Arc::new(ScriptedSynthesizer::new(synth)),
        Duration::from_secs(5),
    );

    let lifecycle = SessionLifecycle::from_parts(
        profile_store.clone(),
        session_store.clone(),
        gateway.clone(),
        tutor_config(),
    );

    TestHarness {
        lifecycle,
        profile_store,
        session_store,
        gateway,
        dialogue,
        data_dir,
    }
}
