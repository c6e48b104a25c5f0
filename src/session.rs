//! Session records and their on-disk store
//!
//! One record per connection lifetime, checkpointed every few exchanges to
//! `sessions/<YYYYMMDD_HHMMSS>.json` and finalized at session end. Readers skip
//! malformed or partially-written files instead of failing, so a crash mid-write
//! never poisons the listing routes.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::profile::CefrLevel;
use crate::turn::{Correction, PronunciationAssessment, TurnPayload};
use crate::{Error, Result};

/// Valid session checkpoint filenames: `YYYYMMDD_HHMMSS.json`.
/// Also the deletion guard; rejects traversal and non-session files.
static SESSION_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}_\d{6}\.json$").expect("valid regex"));

/// One learner-utterance-to-tutor-reply turn, successful or failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    /// When the turn completed
    pub timestamp: DateTime<Utc>,

    /// Raw transcribed input (absent when transcription failed)
    pub user_input: Option<String>,

    /// Corrected form of the input
    pub user_corrected: Option<String>,

    /// Translation of the corrected input
    pub user_translation: Option<String>,

    /// Individual corrections, in utterance order
    #[serde(default)]
    pub corrections: Vec<Correction>,

    /// The tutor's reply
    pub agent_response: Option<String>,

    /// Pronunciation assessment for the input
    pub pronunciation: Option<PronunciationAssessment>,

    /// Whether synthesized audio was attached to the reply
    pub had_tts: bool,

    /// Error description when the turn failed
    pub error: Option<String>,
}

impl Exchange {
    /// Build the record of a completed turn
    #[must_use]
    pub fn completed(
        user_input: String,
        payload: &TurnPayload,
        had_tts: bool,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp: at,
            user_input: Some(user_input),
            user_corrected: Some(payload.corrected.clone()),
            user_translation: Some(payload.translation.clone()),
            corrections: payload.corrections.clone(),
            agent_response: Some(payload.reply.clone()),
            pronunciation: Some(payload.pronunciation.clone()),
            had_tts,
            error: None,
        }
    }

    /// Build the record of a failed turn: downstream fields stay null so the
    /// attempt still counts without inventing content.
    #[must_use]
    pub fn failed(error: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at,
            user_input: None,
            user_corrected: None,
            user_translation: None,
            corrections: Vec::new(),
            agent_response: None,
            pronunciation: None,
            had_tts: false,
            error: Some(error.into()),
        }
    }
}

/// The durable record of one connection's exchanges and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Identifier derived from the start timestamp
    pub session_id: String,

    /// When the session started
    pub start_time: DateTime<Utc>,

    /// When this snapshot was taken (the final end time once finalized)
    pub end_time: DateTime<Utc>,

    /// Elapsed minutes, two decimal places
    pub duration_minutes: f64,

    /// The learner's level at session time
    pub learner_level: CefrLevel,

    /// Number of exchanges; always equals `conversation_log.len()`
    pub exchanges: usize,

    /// The ordered exchange log
    pub conversation_log: Vec<Exchange>,
}

impl SessionRecord {
    /// Derive a session identifier from the start timestamp
    #[must_use]
    pub fn id_for(start: DateTime<Utc>) -> String {
        format!("session_{}", start.to_rfc3339())
    }

    /// Snapshot the in-memory log into a persistable record.
    ///
    /// The only constructor used by the orchestrator, so the exchange count
    /// can never drift from the log length.
    #[must_use]
    pub fn snapshot(
        start: DateTime<Utc>,
        level: CefrLevel,
        log: &[Exchange],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: Self::id_for(start),
            start_time: start,
            end_time: now,
            duration_minutes: minutes_between(start, now),
            learner_level: level,
            exchanges: log.len(),
            conversation_log: log.to_vec(),
        }
    }
}

/// Elapsed minutes between two instants, rounded to two decimals
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let minutes = (end - start).num_milliseconds() as f64 / 60_000.0;
    (minutes * 100.0).round() / 100.0
}

/// Listing view of a stored session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Session identifier
    pub session_id: String,

    /// Checkpoint filename (what the delete route takes)
    pub filename: String,

    /// When the session started
    pub start_time: DateTime<Utc>,

    /// When the session ended (or was last checkpointed)
    pub end_time: DateTime<Utc>,

    /// Elapsed minutes
    pub duration_minutes: f64,

    /// Exchange count
    pub exchanges: usize,

    /// The learner's level at session time
    pub learner_level: CefrLevel,
}

/// File-backed store for session checkpoint records
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Create a store backed by the given directory
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Checkpoint filename for a session started at `start`
    #[must_use]
    pub fn file_name(start: DateTime<Utc>) -> String {
        format!("{}.json", start.format("%Y%m%d_%H%M%S"))
    }

    /// Whether `name` is a well-formed checkpoint filename
    #[must_use]
    pub fn is_valid_file_name(name: &str) -> bool {
        SESSION_FILE_RE.is_match(name)
    }

    /// Write a session snapshot, overwriting any previous checkpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the write fails.
    pub fn save(&self, record: &SessionRecord) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Persistence(format!("failed to create sessions dir: {e}")))?;

        let path = self.dir.join(Self::file_name(record.start_time));
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, json)
            .map_err(|e| Error::Persistence(format!("failed to write session: {e}")))?;

        tracing::debug!(
            path = %path.display(),
            exchanges = record.exchanges,
            "session checkpoint written"
        );
        Ok(path)
    }

    /// List stored sessions, newest first, skipping malformed files
    ///
    /// # Errors
    ///
    /// Returns an error only if the sessions directory exists but cannot be
    /// read; individual unreadable files are skipped with a warning.
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries: Vec<SessionSummary> = self
            .load_all()?
            .into_iter()
            .map(|(filename, record)| SessionSummary {
                session_id: record.session_id,
                filename,
                start_time: record.start_time,
                end_time: record.end_time,
                duration_minutes: record.duration_minutes,
                exchanges: record.exchanges,
                learner_level: record.learner_level,
            })
            .collect();

        summaries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(summaries)
    }

    /// Fetch a full session record by its identifier
    ///
    /// # Errors
    ///
    /// Returns an error if the sessions directory cannot be read.
    pub fn find(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        Ok(self
            .load_all()?
            .into_iter()
            .map(|(_, record)| record)
            .find(|record| record.session_id == session_id))
    }

    /// Delete one checkpoint file by name
    ///
    /// # Errors
    ///
    /// Returns an error if the name does not match the session filename
    /// pattern, the file does not exist, or removal fails.
    pub fn delete(&self, filename: &str) -> Result<()> {
        if !Self::is_valid_file_name(filename) {
            return Err(Error::Persistence(format!(
                "invalid session filename: {filename}"
            )));
        }

        let path = self.dir.join(filename);
        if !path.exists() {
            return Err(Error::NotFound(format!("session file {filename}")));
        }

        std::fs::remove_file(&path)
            .map_err(|e| Error::Persistence(format!("failed to delete session: {e}")))?;
        tracing::info!(filename, "session file deleted");
        Ok(())
    }

    /// Read every parseable session file with its filename
    fn load_all(&self) -> Result<Vec<(String, SessionRecord)>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| Error::Persistence(format!("failed to read sessions dir: {e}")))?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_record(&path) {
                Ok(record) => {
                    let filename = entry.file_name().to_string_lossy().into_owned();
                    records.push((filename, record));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable session file");
                }
            }
        }
        Ok(records)
    }
}

/// Parse one session file
fn read_record(path: &Path) -> Result<SessionRecord> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap()
    }

    fn sample_payload() -> TurnPayload {
        TurnPayload::parse(
            r#"{"corrected": "Guten Morgen!", "translation": "Good morning!", "reply": "Guten Morgen! Wie geht's?"}"#,
        )
        .unwrap()
    }

    #[test]
    fn snapshot_count_always_matches_log_length() {
        let start = start_at();
        let log = vec![
            Exchange::completed("guten morgen".to_string(), &sample_payload(), true, start),
            Exchange::failed("STT error: 503", start),
        ];

        let record = SessionRecord::snapshot(start, CefrLevel::A2, &log, Utc::now());
        assert_eq!(record.exchanges, 2);
        assert_eq!(record.exchanges, record.conversation_log.len());
        assert_eq!(record.session_id, SessionRecord::id_for(start));
    }

    #[test]
    fn file_name_derives_from_start_timestamp() {
        assert_eq!(SessionStore::file_name(start_at()), "20240305_143000.json");
    }

    #[test]
    fn file_name_guard_accepts_only_session_files() {
        assert!(SessionStore::is_valid_file_name("20240305_143000.json"));
        assert!(!SessionStore::is_valid_file_name("../learner_profile.json"));
        assert!(!SessionStore::is_valid_file_name("notes.txt"));
        assert!(!SessionStore::is_valid_file_name("20240305_143000.json.bak"));
    }

    #[test]
    fn failed_exchange_has_null_downstream_fields() {
        let exchange = Exchange::failed("audio quality error: transcript too short", Utc::now());
        assert!(exchange.user_input.is_none());
        assert!(exchange.user_corrected.is_none());
        assert!(exchange.agent_response.is_none());
        assert!(exchange.pronunciation.is_none());
        assert!(!exchange.had_tts);
        assert!(exchange.error.is_some());
    }

    #[test]
    fn minutes_round_to_two_decimals() {
        let start = start_at();
        let end = start + chrono::Duration::seconds(100);
        assert!((minutes_between(start, end) - 1.67).abs() < f64::EPSILON);
    }

    #[test]
    fn store_lists_newest_first_and_skips_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());

        let older = start_at();
        let newer = older + chrono::Duration::hours(2);
        for start in [older, newer] {
            let log = vec![Exchange::completed(
                "hallo".to_string(),
                &sample_payload(),
                false,
                start,
            )];
            store
                .save(&SessionRecord::snapshot(start, CefrLevel::A1, &log, start))
                .unwrap();
        }

        // a partially-written file must not break the listing
        std::fs::write(dir.path().join("20240101_000000.json"), "{ truncated").unwrap();

        let summaries = store.list().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].start_time, newer);
        assert_eq!(summaries[1].start_time, older);
    }

    #[test]
    fn find_returns_matching_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());

        let start = start_at();
        let log = vec![Exchange::failed("STT error: 500", start)];
        let record = SessionRecord::snapshot(start, CefrLevel::B1, &log, start);
        store.save(&record).unwrap();

        let found = store.find(&record.session_id).unwrap().unwrap();
        assert_eq!(found.exchanges, 1);
        assert!(store.find("session_nope").unwrap().is_none());
    }

    #[test]
    fn delete_rejects_names_outside_the_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());

        assert!(store.delete("../learner_profile.json").is_err());
        assert!(store.delete("notes.txt").is_err());
        assert!(store.delete("2024_sessions.json").is_err());
        // well-formed but absent
        assert!(matches!(
            store.delete("20240305_143000.json"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn delete_removes_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());

        let start = start_at();
        let record = SessionRecord::snapshot(start, CefrLevel::A1, &[], start);
        let path = store.save(&record).unwrap();
        assert!(path.exists());

        store.delete("20240305_143000.json").unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn missing_dir_lists_empty() {
        let store = SessionStore::new(PathBuf::from("/nonexistent/parlando-sessions"));
        assert!(store.list().unwrap().is_empty());
    }
}
