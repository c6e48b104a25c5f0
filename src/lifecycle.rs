//! Session open and guaranteed finalization
//!
//! Every session, however it ends, settles its durable state exactly once:
//! profile counters first, then the session record (only when at least one
//! exchange happened).

use chrono::Utc;
use tokio::sync::mpsc;

use crate::Result;
use crate::api::websocket::Outbound;
use crate::config::{Config, TutorConfig};
use crate::gateway::ServiceGateway;
use crate::orchestrator::{EndReason, FinishedSession, SessionRuntime};
use crate::profile::ProfileStore;
use crate::session::{SessionRecord, SessionStore, minutes_between};

/// Opens sessions and settles their durable state when they end
#[derive(Clone)]
pub struct SessionLifecycle {
    profile_store: ProfileStore,
    session_store: SessionStore,
    gateway: ServiceGateway,
    tutor: TutorConfig,
}

impl SessionLifecycle {
    /// Wire a lifecycle manager from resolved configuration
    #[must_use]
    pub fn new(config: &Config, gateway: ServiceGateway) -> Self {
        Self::from_parts(
            ProfileStore::new(config.storage.profile_path()),
            SessionStore::new(config.storage.sessions_dir()),
            gateway,
            config.tutor.clone(),
        )
    }

    /// Wire a lifecycle manager from explicit stores
    #[must_use]
    pub const fn from_parts(
        profile_store: ProfileStore,
        session_store: SessionStore,
        gateway: ServiceGateway,
        tutor: TutorConfig,
    ) -> Self {
        Self {
            profile_store,
            session_store,
            gateway,
            tutor,
        }
    }

    /// Open a session: load the profile and greet the learner
    ///
    /// # Errors
    ///
    /// Returns error if the profile file exists but cannot be read; a
    /// missing file starts a fresh default profile instead.
    pub async fn open(&self, outbound: mpsc::Sender<Outbound>) -> Result<SessionRuntime> {
        let profile = self.profile_store.load_or_default()?;
        tracing::info!(
            learner = %profile.name,
            level = %profile.current_level,
            session_number = profile.session_count + 1,
            "session opened"
        );

        let welcome = Outbound::Status {
            message: format!(
                "Welcome back, {}! Ready to practice {}. Speak naturally!",
                profile.name, self.tutor.language_name
            ),
            level: Some(profile.current_level),
            session_number: Some(profile.session_count + 1),
        };
        if outbound.send(welcome).await.is_err() {
            tracing::debug!("client went away before the welcome notice");
        }

        Ok(SessionRuntime::new(
            profile,
            self.tutor.clone(),
            self.gateway.clone(),
            self.session_store.clone(),
            outbound,
        ))
    }

    /// Finalize a session: update the profile, then persist the record.
    ///
    /// The profile write comes first so the learner's counters survive a
    /// failed record write. A session with no exchanges updates the profile
    /// but leaves no record file. Storage failures are logged and swallowed;
    /// connection teardown proceeds regardless.
    pub fn finalize(&self, session: FinishedSession, reason: EndReason) {
        let ended_at = Utc::now();
        let minutes = minutes_between(session.started_at, ended_at);

        let mut profile = session.profile;
        profile.record_session(minutes, ended_at);
        if let Err(e) = self.profile_store.save(&profile) {
            tracing::error!(error = %e, "profile update failed at session end");
        }

        if session.log.is_empty() {
            tracing::info!(?reason, minutes, "session ended with no exchanges, profile updated");
            return;
        }

        let record = SessionRecord::snapshot(
            session.started_at,
            profile.current_level,
            &session.log,
            ended_at,
        );
        match self.session_store.save(&record) {
            Ok(path) => {
                tracing::info!(
                    path = %path.display(),
                    exchanges = record.exchanges,
                    minutes,
                    ?reason,
                    "session finalized"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "session record write failed");
            }
        }
    }
}
