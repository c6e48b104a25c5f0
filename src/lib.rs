//! Parlando - conversation practice server for language learners
//!
//! This library provides the core functionality for the parlando server:
//! - A per-connection conversation loop (STT -> tutor dialogue -> TTS)
//! - A learner profile and per-session records persisted as JSON
//! - A WebSocket control channel plus a small HTTP API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Browser frontend                     │
//! │   microphone capture  │  transcript + audio player  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ WebSocket / HTTP
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Parlando                          │
//! │   Orchestrator  │  Lifecycle  │  Profile  │  API    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              External services                       │
//! │   Whisper STT  │  Chat completions  │  TTS          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod orchestrator;
pub mod profile;
pub mod prompt;
pub mod session;
pub mod setup;
pub mod turn;

pub use config::Config;
pub use error::{Error, Result};
pub use gateway::ServiceGateway;
pub use lifecycle::SessionLifecycle;
pub use orchestrator::{EndReason, SessionRuntime};
pub use profile::{CefrLevel, LearnerProfile, ProfileStore};
pub use session::{SessionRecord, SessionStore};
pub use turn::TurnPayload;
