//! Core data types shared across indexing, retrieval, and the agent.

mod conversation;

use serde::{Deserialize, Serialize};

pub use conversation::{Conversation, ConversationTurn, GroundingSource, TurnRole};

/// An embedded span of page text; the unit of indexing and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Process-unique identifier (`"{page}-{sequence}"`).
    pub id: String,
    /// Window text as cut from the page.
    pub text: String,
    /// 1-based source page.
    pub page_number: u32,
    /// Embedding vector.
    #[serde(skip_serializing, default)]
    pub vector: Vec<f32>,
}

impl Chunk {
    /// Formats the chunk as a grounding line: `[Page P]: text`.
    #[must_use]
    pub fn as_context(&self) -> String {
        format!("[Page {}]: {}", self.page_number, self.text)
    }
}
