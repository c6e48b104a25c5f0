//! Structured dialogue turn result
//!
//! The dialogue model is contracted to answer with a single JSON object holding
//! the corrected utterance, a translation, individual corrections, a
//! pronunciation assessment, and the next conversational reply. Parsing is
//! total: raw output either becomes a [`TurnPayload`] or a [`MalformedTurn`],
//! and the caller substitutes [`TurnPayload::fallback`] for the latter.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Neutral filler used when the model's output cannot be parsed
const FALLBACK_REPLY: &str = "Interessant! Erzähl mir mehr.";

/// A single correction made to the learner's utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    /// Correction category (e.g. "grammar", "vocabulary", "word_order")
    #[serde(rename = "type")]
    pub kind: String,

    /// The learner's original span
    pub original: String,

    /// The corrected span
    pub corrected: String,

    /// Why the correction applies
    pub reason: String,
}

/// Quality tier of a pronunciation assessment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PronunciationQuality {
    Clear,
    #[default]
    Acceptable,
    NeedsWork,
}

/// Pronunciation assessment attached to a turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PronunciationAssessment {
    /// Overall quality tier
    pub quality: PronunciationQuality,

    /// Specific issue worth practicing, when one stood out
    #[serde(default)]
    pub issue: Option<String>,
}

/// Raw dialogue output that failed to parse into the contracted structure
#[derive(Debug, Error)]
#[error("malformed dialogue output: {0}")]
pub struct MalformedTurn(String);

/// The structured result of one dialogue-generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnPayload {
    /// The learner's utterance, corrected
    pub corrected: String,

    /// Translation of the corrected utterance
    pub translation: String,

    /// Individual corrections, in utterance order
    #[serde(default)]
    pub corrections: Vec<Correction>,

    /// Pronunciation assessment
    #[serde(default)]
    pub pronunciation: PronunciationAssessment,

    /// The tutor's next conversational utterance
    pub reply: String,
}

impl TurnPayload {
    /// Parse raw model output into the contracted structure
    ///
    /// # Errors
    ///
    /// Returns [`MalformedTurn`] when the output is not valid JSON or lacks
    /// required fields. The caller falls back, never retries.
    pub fn parse(raw: &str) -> std::result::Result<Self, MalformedTurn> {
        serde_json::from_str(raw).map_err(|e| MalformedTurn(e.to_string()))
    }

    /// Deterministic substitute for unparseable dialogue output: echo the
    /// input as "corrected" and continue with a neutral filler reply.
    #[must_use]
    pub fn fallback(user_text: &str) -> Self {
        Self {
            corrected: user_text.to_string(),
            translation: format!("(your input: {user_text})"),
            corrections: Vec::new(),
            pronunciation: PronunciationAssessment::default(),
            reply: FALLBACK_REPLY.to_string(),
        }
    }
}
