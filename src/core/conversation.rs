//! Append-only conversation log.
//!
//! The first turn of a session is a synthetic model turn announcing the
//! indexed document. It is shown to the user but never sent back to the
//! generation provider.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The human.
    User,
    /// The agent.
    Model,
}

impl TurnRole {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// An external source the provider grounded its answer on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    /// Source URL.
    pub uri: String,
    /// Source title.
    pub title: String,
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Speaker.
    pub role: TurnRole,
    /// Message text.
    pub text: String,
    /// Attached base64 JPEG, for visual questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Grounding sources returned with a model answer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grounding: Vec<GroundingSource>,
    /// Agent step log for a model answer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
    /// Synthetic turns are excluded from provider history.
    #[serde(default)]
    pub synthetic: bool,
}

impl ConversationTurn {
    /// A user turn, optionally carrying an image.
    #[must_use]
    pub fn user(text: impl Into<String>, image: Option<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            image,
            grounding: Vec::new(),
            steps: Vec::new(),
            synthetic: false,
        }
    }

    /// A plain model turn.
    #[must_use]
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
            image: None,
            grounding: Vec::new(),
            steps: Vec::new(),
            synthetic: false,
        }
    }

    /// The synthetic index-summary turn that opens a session.
    #[must_use]
    pub fn index_summary(text: impl Into<String>) -> Self {
        Self {
            synthetic: true,
            ..Self::model(text)
        }
    }
}

/// Ordered, append-only sequence of turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
    #[serde(skip)]
    max_history_turns: Option<usize>,
}

impl Conversation {
    /// Creates an empty conversation with unbounded provider history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits [`history`](Self::history) to the most recent `n` turns.
    #[must_use]
    pub const fn with_max_history_turns(mut self, n: Option<usize>) -> Self {
        self.max_history_turns = n;
        self
    }

    /// Appends a turn.
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// All turns, synthetic ones included.
    #[must_use]
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Last turn, if any.
    #[must_use]
    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if there are no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns to replay to the generation provider: non-synthetic turns,
    /// limited to the configured window.
    #[must_use]
    pub fn history(&self) -> Vec<ConversationTurn> {
        let genuine: Vec<&ConversationTurn> = self.turns.iter().filter(|t| !t.synthetic).collect();
        let skip = self
            .max_history_turns
            .map_or(0, |n| genuine.len().saturating_sub(n));
        genuine.into_iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_skips_synthetic_turn() {
        let mut conv = Conversation::new();
        conv.push(ConversationTurn::index_summary("I've indexed it."));
        conv.push(ConversationTurn::user("hi", None));
        conv.push(ConversationTurn::model("hello"));

        assert_eq!(conv.len(), 3);
        let history = conv.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert!(history.iter().all(|t| !t.synthetic));
    }

    #[test]
    fn test_history_window() {
        let mut conv = Conversation::new().with_max_history_turns(Some(2));
        conv.push(ConversationTurn::index_summary("summary"));
        for i in 0..5 {
            conv.push(ConversationTurn::user(format!("q{i}"), None));
        }
        let texts: Vec<String> = conv.history().into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["q3", "q4"]);
        // the log itself is never truncated
        assert_eq!(conv.len(), 6);
    }

    #[test]
    fn test_turn_serialization_omits_empty_fields() {
        let json = serde_json::to_string(&ConversationTurn::model("ok")).unwrap_or_default();
        assert!(json.contains("\"model\""));
        assert!(!json.contains("image"));
        assert!(!json.contains("steps"));
    }
}
