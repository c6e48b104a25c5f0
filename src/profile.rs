//! Learner profile record and its on-disk store
//!
//! One profile per installation, stored as `learner_profile.json` in the data
//! directory. Mutated only at session finalization (counters, timestamps) and via
//! the explicit update route.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// CEFR proficiency level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CefrLevel {
    #[default]
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl std::fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
        };
        f.write_str(s)
    }
}

/// The persistent learner-state record shared across sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerProfile {
    /// Learner's name, used in the welcome notice and the system instruction
    pub name: String,

    /// Current proficiency level
    pub current_level: CefrLevel,

    /// Completed session count (incremented once per session, at finalization)
    pub session_count: u64,

    /// Accumulated practice minutes, rounded to two decimals
    pub total_minutes: f64,

    /// When this profile was first created
    pub created_date: DateTime<Utc>,

    /// When the most recent session ended
    pub last_session: Option<DateTime<Utc>>,

    /// Observed strengths (inert: stored and prompted, never derived)
    pub strengths: Vec<String>,

    /// Observed weaknesses (inert: stored and prompted, never derived)
    pub weaknesses: Vec<String>,

    /// Recurring pronunciation issues
    pub pronunciation_issues: Vec<String>,

    /// Vocabulary-error term → free-form metadata
    pub vocabulary_errors: BTreeMap<String, serde_json::Value>,

    /// Grammar pattern → free-form metadata
    pub grammar_patterns: BTreeMap<String, serde_json::Value>,

    /// Free-text personalization context for the system instruction
    pub personality_context: String,

    /// Topics the learner likes to talk about
    pub preferred_topics: Vec<String>,
}

impl Default for LearnerProfile {
    fn default() -> Self {
        Self {
            name: "Learner".to_string(),
            current_level: CefrLevel::A1,
            session_count: 0,
            total_minutes: 0.0,
            created_date: Utc::now(),
            last_session: None,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            pronunciation_issues: Vec::new(),
            vocabulary_errors: BTreeMap::new(),
            grammar_patterns: BTreeMap::new(),
            personality_context: String::new(),
            preferred_topics: Vec::new(),
        }
    }
}

impl LearnerProfile {
    /// Record a finished session: bump the counter, accumulate minutes,
    /// stamp the last-session time.
    pub fn record_session(&mut self, minutes: f64, ended_at: DateTime<Utc>) {
        self.session_count += 1;
        self.total_minutes = round2(self.total_minutes + minutes);
        self.last_session = Some(ended_at);
    }

    /// Merge a partial JSON object into this profile.
    ///
    /// Known keys overwrite their fields; unknown keys are dropped by the
    /// schema round-trip. The whole merge is rejected if a known key carries
    /// a value of the wrong shape.
    ///
    /// # Errors
    ///
    /// Returns an error if `patch` is not a JSON object or a known field
    /// fails to deserialize.
    pub fn merge(&mut self, patch: &serde_json::Value) -> Result<()> {
        let Some(updates) = patch.as_object() else {
            return Err(Error::Persistence(
                "profile update must be a JSON object".to_string(),
            ));
        };

        let mut current = serde_json::to_value(&*self)?;
        if let Some(fields) = current.as_object_mut() {
            for (key, value) in updates {
                fields.insert(key.clone(), value.clone());
            }
        }

        *self = serde_json::from_value(current)?;
        Ok(())
    }
}

/// Round to two decimal places (minutes accounting)
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// File-backed store for the learner profile
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Create a store backed by the given file path
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the profile, falling back to the default when no file exists yet
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed;
    /// a corrupt profile must not be silently replaced.
    pub fn load_or_default(&self) -> Result<LearnerProfile> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "no profile file, using defaults");
            return Ok(LearnerProfile::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::Persistence(format!("failed to read profile: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Persistence(format!("failed to parse profile: {e}")))
    }

    /// Write the profile to disk
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the write fails.
    pub fn save(&self, profile: &LearnerProfile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Persistence(format!("failed to create data dir: {e}")))?;
        }

        let json = serde_json::to_string_pretty(profile)?;
        std::fs::write(&self.path, json)
            .map_err(|e| Error::Persistence(format!("failed to write profile: {e}")))?;

        tracing::debug!(path = %self.path.display(), "profile saved");
        Ok(())
    }
}
