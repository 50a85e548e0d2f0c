//! One document conversation.
//!
//! A [`Session`] owns the document's read-only [`VectorStore`], the
//! [`Orchestrator`] that answers against it, and the append-only
//! [`Conversation`]. The first turn is always a synthetic index summary.

use std::fmt;

use tracing::{info, warn};

use crate::agent::{AgentAnswer, InsightsAgent, Orchestrator, PaperInsights};
use crate::core::{Conversation, ConversationTurn};
use crate::error::{AgentError, Result};
use crate::store::{IndexStats, VectorStore};

/// Label prefixed to the model turn recorded for a failed run.
pub const AGENT_ERROR_PREFIX: &str = "Agent Error: ";

/// Audience level for [`Session::explain_selection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainLevel {
    /// Plain-language explanation.
    HighSchool,
    /// Expert-level explanation.
    PhD,
}

impl ExplainLevel {
    /// Label used in the explain prompt.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::HighSchool => "High School",
            Self::PhD => "PhD",
        }
    }
}

impl fmt::Display for ExplainLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Builds the user message for explaining a text selection.
#[must_use]
pub fn explain_prompt(selection: &str, level: ExplainLevel) -> String {
    format!("Explain this text ({level} level): \"{selection}\"")
}

/// Builds the user message for analyzing a rendered page.
#[must_use]
pub fn analyze_page_prompt(page: u32) -> String {
    format!("Analyze this visual page (Page {page}). Explain diagrams or charts found.")
}

/// Builds the synthetic first turn of a session.
#[must_use]
pub fn index_summary(title: &str, chunks: usize) -> String {
    format!(
        "I've indexed **{title}** ({chunks} chunks). \n\n\
         I can read charts, search for citations (Semantic Scholar), and do math."
    )
}

/// A conversation about one indexed document.
pub struct Session {
    store: VectorStore,
    orchestrator: Orchestrator,
    conversation: Conversation,
    insights: PaperInsights,
    stats: IndexStats,
}

impl Session {
    /// Indexes `text` and opens a session over it.
    ///
    /// The store is built with the orchestrator's embedder so queries and
    /// chunks share one embedding space. With `with_insights`, the document
    /// is analyzed for a title and summary; any failure there degrades to an
    /// untitled summary rather than aborting the session.
    ///
    /// # Errors
    ///
    /// Returns an error only if the chunker configuration is invalid.
    pub async fn index(text: &str, orchestrator: Orchestrator, with_insights: bool) -> Result<Self> {
        let config = orchestrator.config();
        let (store, stats) =
            VectorStore::build(text, orchestrator.embedder().as_ref(), &config.index).await?;

        let insights = if with_insights {
            let agent = InsightsAgent::new(config, orchestrator.prompts().insights.clone());
            match agent
                .analyze(orchestrator.provider().as_ref(), text, true)
                .await
            {
                Ok((insights, _)) => insights,
                Err(e) => {
                    warn!(error = %e, "document analysis failed");
                    PaperInsights::failed()
                }
            }
        } else {
            PaperInsights::default()
        };

        let conversation = Conversation::new().with_max_history_turns(config.max_history_turns);
        let mut session = Self {
            store,
            orchestrator,
            conversation,
            insights,
            stats,
        };
        session.conversation.push(ConversationTurn::index_summary(index_summary(
            &session.insights.title,
            session.store.len(),
        )));

        info!(
            title = %session.insights.title,
            chunks = session.store.len(),
            "session ready"
        );
        Ok(session)
    }

    /// Sends a user message and records the answer.
    ///
    /// The user turn is always recorded. On failure a labeled
    /// `Agent Error: …` model turn is recorded and the error returned.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's [`AgentError`].
    pub async fn send_message(
        &mut self,
        text: &str,
        image: Option<String>,
    ) -> std::result::Result<AgentAnswer, AgentError> {
        let history = self.conversation.history();
        self.conversation
            .push(ConversationTurn::user(text, image.clone()));

        match self
            .orchestrator
            .run(&self.store, text, image.as_deref(), &history)
            .await
        {
            Ok(answer) => {
                let mut turn = ConversationTurn::model(answer.text.clone());
                turn.grounding.clone_from(&answer.grounding);
                turn.steps.clone_from(&answer.steps);
                self.conversation.push(turn);
                Ok(answer)
            }
            Err(e) => {
                warn!(error = %e, "agent run failed");
                self.conversation
                    .push(ConversationTurn::model(format!("{AGENT_ERROR_PREFIX}{e}")));
                Err(e)
            }
        }
    }

    /// Asks for an explanation of a text selection at the given level.
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message).
    pub async fn explain_selection(
        &mut self,
        selection: &str,
        level: ExplainLevel,
    ) -> std::result::Result<AgentAnswer, AgentError> {
        self.send_message(&explain_prompt(selection, level), None)
            .await
    }

    /// Asks for an analysis of a rendered page image (base64 JPEG).
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message).
    pub async fn analyze_page(
        &mut self,
        page: u32,
        image: String,
    ) -> std::result::Result<AgentAnswer, AgentError> {
        self.send_message(&analyze_page_prompt(page), Some(image))
            .await
    }

    /// Renders the conversation as a markdown document.
    #[must_use]
    pub fn export_markdown(&self) -> String {
        let turns = self
            .conversation
            .turns()
            .iter()
            .map(|t| format!("### {}\n{}", t.role.as_str().to_uppercase(), t.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        format!(
            "# {} - Analysis\n\n## Summary\n{}\n\n## Chat History\n\n{turns}",
            self.insights.title, self.insights.summary
        )
    }

    /// Suggested file name for [`export_markdown`](Self::export_markdown):
    /// the lowercased title with every non-alphanumeric character replaced.
    #[must_use]
    pub fn export_filename(&self) -> String {
        let stem: String = self
            .insights
            .title
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{stem}_analysis.md")
    }

    /// The document's vector store.
    #[must_use]
    pub const fn store(&self) -> &VectorStore {
        &self.store
    }

    /// The conversation log, synthetic turns included.
    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The document insights (untitled if analysis was skipped, marked
    /// failed if it could not complete).
    #[must_use]
    pub const fn insights(&self) -> &PaperInsights {
        &self.insights
    }

    /// Counters from indexing.
    #[must_use]
    pub const fn stats(&self) -> IndexStats {
        self.stats
    }
}
