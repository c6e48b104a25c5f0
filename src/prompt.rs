//! Personalized system instruction for the dialogue model

use crate::profile::LearnerProfile;

/// How many learning-signal items to surface per category
const MAX_SIGNALS: usize = 3;

/// Build the per-session system instruction from the learner profile.
///
/// Pins the JSON contract the dialogue model must answer with, the shape
/// [`crate::turn::TurnPayload::parse`] accepts.
#[must_use]
pub fn build_system_instruction(profile: &LearnerProfile, language_name: &str) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "You are a friendly, patient {language_name} conversation tutor. \
         Speak {language_name} suited to the learner's level, keep the conversation \
         going naturally, and correct mistakes gently.\n\n"
    ));

    out.push_str("Learner profile:\n");
    out.push_str(&format!("- Name: {}\n", profile.name));
    out.push_str(&format!("- Level: {} (CEFR)\n", profile.current_level));
    out.push_str(&format!(
        "- Completed sessions: {}\n",
        profile.session_count
    ));

    if !profile.preferred_topics.is_empty() {
        out.push_str(&format!(
            "- Enjoys talking about: {}\n",
            profile.preferred_topics.join(", ")
        ));
    }
    if !profile.weaknesses.is_empty() {
        out.push_str(&format!(
            "- Known weaknesses: {}\n",
            top(&profile.weaknesses)
        ));
    }
    if !profile.pronunciation_issues.is_empty() {
        out.push_str(&format!(
            "- Pronunciation practice targets: {}\n",
            top(&profile.pronunciation_issues)
        ));
    }
    if !profile.personality_context.is_empty() {
        out.push_str(&format!("- Context: {}\n", profile.personality_context));
    }

    out.push_str(
        "\nFor every learner utterance, respond with a single JSON object and nothing else:\n\
         {\n\
         \x20 \"corrected\": the learner's utterance with mistakes fixed,\n\
         \x20 \"translation\": English translation of the corrected utterance,\n\
         \x20 \"corrections\": [{\"type\", \"original\", \"corrected\", \"reason\"}] (empty when nothing to fix),\n\
         \x20 \"pronunciation\": {\"quality\": \"clear\" | \"acceptable\" | \"needs_work\", \"issue\": null or a short note},\n\
         \x20 \"reply\": your next conversational utterance, in ",
    );
    out.push_str(language_name);
    out.push_str(
        ", at the learner's level\n\
         }\n\
         Keep replies to one or two sentences and end with something the learner can answer.\n",
    );

    out
}

/// First few signals, comma-joined
fn top(signals: &[String]) -> String {
    signals
        .iter()
        .take(MAX_SIGNALS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::CefrLevel;

    #[test]
    fn instruction_carries_profile_facts() {
        let profile = LearnerProfile {
            name: "Ada".to_string(),
            current_level: CefrLevel::B1,
            preferred_topics: vec!["music".to_string(), "cooking".to_string()],
            ..LearnerProfile::default()
        };

        let prompt = build_system_instruction(&profile, "German");
        assert!(prompt.contains("Ada"));
        assert!(prompt.contains("B1"));
        assert!(prompt.contains("music, cooking"));
        assert!(prompt.contains("German conversation tutor"));
    }

    #[test]
    fn signal_lists_are_capped() {
        let profile = LearnerProfile {
            weaknesses: (0..6).map(|i| format!("weakness-{i}")).collect(),
            ..LearnerProfile::default()
        };

        let prompt = build_system_instruction(&profile, "German");
        assert!(prompt.contains("weakness-0"));
        assert!(prompt.contains("weakness-2"));
        assert!(!prompt.contains("weakness-3"));
    }

    #[test]
    fn json_contract_keys_are_pinned() {
        let prompt = build_system_instruction(&LearnerProfile::default(), "French");
        for key in ["corrected", "translation", "corrections", "pronunciation", "reply"] {
            assert!(prompt.contains(&format!("\"{key}\"")), "missing key {key}");
        }
        assert!(prompt.contains("needs_work"));
    }

    #[test]
    fn empty_signal_sections_are_omitted() {
        let prompt = build_system_instruction(&LearnerProfile::default(), "German");
        assert!(!prompt.contains("Known weaknesses"));
        assert!(!prompt.contains("Pronunciation practice targets"));
    }
}
