//! Per-connection conversation loop
//!
//! One [`SessionRuntime`] per connection drives each inbound audio unit
//! through transcription, dialogue generation, and speech synthesis, and
//! appends the outcome to the in-memory exchange log. No two turns of one
//! session overlap; the external calls are the only suspension points, so
//! dropping the serve future cancels at most the stage in flight.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::api::websocket::{AgentMessage, Inbound, Outbound, UserMessage};
use crate::config::TutorConfig;
use crate::context::ContextWindow;
use crate::gateway::{DialogueRequest, ServiceGateway};
use crate::profile::LearnerProfile;
use crate::session::{Exchange, SessionRecord, SessionStore};
use crate::turn::TurnPayload;
use crate::{Error, Result};

/// Guidance sent when the audio cannot be transcribed
const AUDIO_QUALITY_NOTICE: &str = "Could not make out your speech. \
     Try speaking closer to the microphone or in a quieter environment.";

/// Why a session loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Client sent `end_session`
    ClientRequest,
    /// Connection dropped
    Disconnect,
}

/// Pipeline stage of the turn in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Transcribing,
    Generating,
    Synthesizing,
}

/// Lifecycle state of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    AwaitingInput,
    ProcessingTurn(TurnStage),
    Ending,
    Ended,
}

/// State and dependencies of one live session
#[derive(Debug)]
pub struct SessionRuntime {
    profile: LearnerProfile,
    log: Vec<Exchange>,
    started_at: DateTime<Utc>,
    state: SessionState,
    system_instruction: String,
    window: ContextWindow,
    tutor: TutorConfig,
    gateway: ServiceGateway,
    session_store: SessionStore,
    outbound: mpsc::Sender<Outbound>,
}

/// What survives the session loop for finalization
pub struct FinishedSession {
    pub profile: LearnerProfile,
    pub log: Vec<Exchange>,
    pub started_at: DateTime<Utc>,
}

impl SessionRuntime {
    /// Create a runtime for a freshly opened session
    #[must_use]
    pub fn new(
        profile: LearnerProfile,
        tutor: TutorConfig,
        gateway: ServiceGateway,
        session_store: SessionStore,
        outbound: mpsc::Sender<Outbound>,
    ) -> Self {
        let system_instruction =
            crate::prompt::build_system_instruction(&profile, &tutor.language_name);
        let window = ContextWindow::new(tutor.context_window);
        Self {
            profile,
            log: Vec::new(),
            started_at: Utc::now(),
            state: SessionState::Starting,
            system_instruction,
            window,
            tutor,
            gateway,
            session_store,
            outbound,
        }
    }

    /// Exchanges appended so far, failed turns included
    #[must_use]
    pub fn exchanges(&self) -> &[Exchange] {
        &self.log
    }

    /// Current loop state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Process inbound units until the client ends the session or the
    /// channel closes
    pub async fn serve(&mut self, inbound: &mut mpsc::Receiver<Inbound>) -> EndReason {
        self.state = SessionState::AwaitingInput;
        while let Some(frame) = inbound.recv().await {
            match frame {
                Inbound::Audio { audio } => {
                    let Some(encoded) = audio.filter(|a| !a.is_empty()) else {
                        continue;
                    };
                    match BASE64.decode(&encoded) {
                        Ok(bytes) => self.process_turn(&bytes).await,
                        Err(e) => {
                            tracing::warn!(error = %e, "audio frame is not valid base64");
                            self.send(Outbound::Error {
                                category: "processing".to_string(),
                                message: "invalid audio encoding".to_string(),
                            })
                            .await;
                        }
                    }
                    self.state = SessionState::AwaitingInput;
                }
                Inbound::EndSession => {
                    tracing::info!(exchanges = self.log.len(), "session end requested");
                    self.state = SessionState::Ending;
                    return EndReason::ClientRequest;
                }
            }
        }
        self.state = SessionState::Ending;
        EndReason::Disconnect
    }

    /// Drive one audio unit through the full pipeline
    async fn process_turn(&mut self, audio: &[u8]) {
        self.state = SessionState::ProcessingTurn(TurnStage::Transcribing);
        self.send(Outbound::Status {
            message: "Processing your speech...".to_string(),
            level: None,
            session_number: None,
        })
        .await;

        let user_text = match self.transcribe(audio).await {
            Ok(text) => text,
            Err(e) => {
                self.fail_turn(&e).await;
                return;
            }
        };
        tracing::info!(transcript = %user_text, "learner utterance transcribed");

        self.state = SessionState::ProcessingTurn(TurnStage::Generating);
        let request = DialogueRequest {
            system_instruction: self.system_instruction.clone(),
            context: self.window.pairs(&self.log),
            user_text: user_text.clone(),
        };
        // Generation never aborts the turn: transport failures and malformed
        // output both fall back to a deterministic payload
        let payload = match self.gateway.generate(&request).await {
            Ok(raw) => TurnPayload::parse(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "dialogue output malformed, using fallback");
                TurnPayload::fallback(&user_text)
            }),
            Err(e) => {
                tracing::error!(error = %e, "dialogue generation failed, using fallback");
                TurnPayload::fallback(&user_text)
            }
        };

        self.state = SessionState::ProcessingTurn(TurnStage::Synthesizing);
        let tts_audio = match self.gateway.synthesize(&payload.reply).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(error = %e, "synthesis failed, continuing without audio");
                None
            }
        };

        let now = Utc::now();
        let had_tts = tts_audio.is_some();
        self.log
            .push(Exchange::completed(user_text.clone(), &payload, had_tts, now));
        self.checkpoint_if_due();

        self.send(Outbound::Conversation {
            timestamp: now,
            user: UserMessage {
                original: user_text,
                corrected: payload.corrected,
                translation: payload.translation,
                corrections: payload.corrections,
                pronunciation: payload.pronunciation,
            },
            agent: AgentMessage {
                text: payload.reply,
                audio: tts_audio.map(|bytes| BASE64.encode(bytes)),
            },
        })
        .await;
    }

    /// Transcription stage: the external call plus the usability check
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let raw = self.gateway.transcribe(audio).await?;
        let text = raw.trim().to_string();
        if text.chars().count() < self.tutor.min_transcript_chars {
            return Err(Error::AudioQuality(format!(
                "transcript too short ({} chars)",
                text.chars().count()
            )));
        }
        Ok(text)
    }

    /// Record a failed turn and tell the client what happened
    async fn fail_turn(&mut self, error: &Error) {
        self.log.push(Exchange::failed(error.to_string(), Utc::now()));
        self.checkpoint_if_due();

        let frame = if error.is_audio_quality() {
            tracing::warn!(error = %error, "turn rejected for audio quality");
            Outbound::Error {
                category: "audio_quality".to_string(),
                message: AUDIO_QUALITY_NOTICE.to_string(),
            }
        } else {
            tracing::error!(error = %error, "turn failed");
            Outbound::Error {
                category: "processing".to_string(),
                message: format!("Error processing audio: {error}"),
            }
        };
        self.send(frame).await;
    }

    /// Persist a snapshot when the exchange count hits the interval.
    /// Write failures are logged and swallowed; the session continues.
    fn checkpoint_if_due(&self) {
        let interval = self.tutor.checkpoint_interval;
        if interval == 0 || self.log.len() % interval != 0 {
            return;
        }
        let record = SessionRecord::snapshot(
            self.started_at,
            self.profile.current_level,
            &self.log,
            Utc::now(),
        );
        match self.session_store.save(&record) {
            Ok(path) => {
                tracing::debug!(
                    path = %path.display(),
                    exchanges = record.exchanges,
                    "session checkpoint saved"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "checkpoint save failed, continuing");
            }
        }
    }

    /// Push a frame to the client. A closed channel only means the
    /// connection is already gone and the loop is about to stop.
    async fn send(&self, frame: Outbound) {
        if self.outbound.send(frame).await.is_err() {
            tracing::debug!("outbound channel closed, frame dropped");
        }
    }

    /// Close the loop and hand the session's state over for finalization
    #[must_use]
    pub fn finish(mut self) -> FinishedSession {
        self.state = SessionState::Ended;
        tracing::debug!(exchanges = self.log.len(), "session loop finished");
        FinishedSession {
            profile: self.profile,
            log: self.log,
            started_at: self.started_at,
        }
    }
}
