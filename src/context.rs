//! Bounded conversation-context window
//!
//! The dialogue model sees only the most recent W exchanges of the running
//! session, as (input, reply) pairs in chronological order. There is no
//! summarization; older turns simply fall off the window.

use serde::Serialize;

use crate::session::Exchange;

/// One prior turn supplied as dialogue context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextPair {
    /// What the learner said
    pub user: String,

    /// What the tutor replied
    pub reply: String,
}

/// Derives the bounded context window from the exchange log
#[derive(Debug, Clone, Copy)]
pub struct ContextWindow {
    size: usize,
}

impl ContextWindow {
    /// Create a window of the given size
    #[must_use]
    pub const fn new(size: usize) -> Self {
        Self { size }
    }

    /// The most recent `size` exchanges' (input, reply) pairs, oldest first.
    ///
    /// Failed turns occupy window slots but contribute no pair; the model
    /// never sees placeholder text for them.
    #[must_use]
    pub fn pairs(&self, log: &[Exchange]) -> Vec<ContextPair> {
        let start = log.len().saturating_sub(self.size);
        log[start..]
            .iter()
            .filter_map(|exchange| {
                match (&exchange.user_input, &exchange.agent_response) {
                    (Some(user), Some(reply)) => Some(ContextPair {
                        user: user.clone(),
                        reply: reply.clone(),
                    }),
                    _ => None,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::TurnPayload;
    use chrono::Utc;

    fn completed(n: usize) -> Exchange {
        let payload = TurnPayload::parse(&format!(
            r#"{{"corrected": "satz {n}", "translation": "sentence {n}", "reply": "antwort {n}"}}"#
        ))
        .unwrap();
        Exchange::completed(format!("satz {n}"), &payload, false, Utc::now())
    }

    #[test]
    fn window_of_eight_from_log_of_twenty() {
        let log: Vec<Exchange> = (0..20).map(completed).collect();
        let pairs = ContextWindow::new(8).pairs(&log);

        assert_eq!(pairs.len(), 8);
        assert_eq!(pairs[0].user, "satz 12");
        assert_eq!(pairs[7].user, "satz 19");
        assert_eq!(pairs[7].reply, "antwort 19");
    }

    #[test]
    fn short_log_is_returned_whole() {
        let log: Vec<Exchange> = (0..3).map(completed).collect();
        let pairs = ContextWindow::new(8).pairs(&log);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].user, "satz 0");
    }

    #[test]
    fn failed_turns_take_slots_but_yield_no_pairs() {
        let mut log: Vec<Exchange> = (0..7).map(completed).collect();
        log.push(Exchange::failed("STT error: timeout", Utc::now()));

        let pairs = ContextWindow::new(4).pairs(&log);
        // window covers exchanges 4..8; the failed one contributes nothing
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].user, "satz 4");
        assert_eq!(pairs[2].user, "satz 6");
    }

    #[test]
    fn empty_log_yields_empty_window() {
        assert!(ContextWindow::new(8).pairs(&[]).is_empty());
    }
}
