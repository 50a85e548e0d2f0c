//! Orchestrator for one retrieval-grounded, tool-using answer.
//!
//! Coordinates the per-message pipeline: retrieve → build grounding prompt →
//! generate → bounded tool loop → answer with citations and step log.
//!
//! ```text
//! Retrieving ──► Generating ──► (ToolPending ⇄ Generating)* ──► Done
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use super::agentic_loop::agentic_loop;
use super::answer::{AgentAnswer, NO_RESPONSE, cited_pages};
use super::config::AgentConfig;
use super::executor::ToolExecutor;
use super::message::{
    ChatRequest, ImageAttachment, history_message, system_message, user_message_with_image,
};
use super::prompt::{PromptSet, build_context, build_system_instruction};
use super::provider::LlmProvider;
use super::tool::ToolSet;
use crate::core::ConversationTurn;
use crate::embedding::Embedder;
use crate::error::AgentError;
use crate::store::{ScoredChunk, VectorStore};

/// Maximum accepted query length in bytes. Large enough for an explain
/// request quoting several full pages.
pub const MAX_QUERY_LEN: usize = 200_000;

/// Step-log entry for the retrieval phase.
pub const STEP_RETRIEVING: &str = "Retrieving relevant pages...";
/// Step-log entry added when the message carries an image.
pub const STEP_VISUAL: &str = "Analyzing visual content...";

/// Ephemeral state of one user-message run. Discarded when the run ends.
#[derive(Debug)]
struct RunState<'a> {
    query: &'a str,
    image: Option<ImageAttachment>,
    retrieved: Vec<ScoredChunk>,
    steps: Vec<String>,
    history: Vec<&'a ConversationTurn>,
}

/// Answers user messages against one document's vector store.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
    executor: ToolExecutor,
    tools: ToolSet,
    config: AgentConfig,
    prompts: PromptSet,
}

impl Orchestrator {
    /// Creates a new orchestrator.
    ///
    /// Loads prompt templates from [`AgentConfig::prompt_dir`], falling back
    /// to compiled-in defaults. The embedder must be the one the store was
    /// built with.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        executor: ToolExecutor,
        config: AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self {
            provider,
            embedder,
            executor,
            tools: ToolSet::agent_tools(),
            config,
            prompts,
        }
    }

    /// Replaces the prompt set.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Returns the generation provider.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Returns the embedder shared with the store.
    #[must_use]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Returns the prompt set.
    #[must_use]
    pub const fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Answers one user message.
    ///
    /// # Arguments
    ///
    /// * `store` - Vector store of the current document
    /// * `query` - User message text
    /// * `image` - Optional base64 JPEG attached to the message
    /// * `history` - Prior turns; synthetic turns are skipped
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] for an empty or oversized query,
    /// [`AgentError::Retrieval`] if the query cannot be embedded, and any
    /// provider error. Tool failures and the round bound are not errors.
    pub async fn run(
        &self,
        store: &VectorStore,
        query: &str,
        image: Option<&str>,
        history: &[ConversationTurn],
    ) -> Result<AgentAnswer, AgentError> {
        if query.trim().is_empty() {
            return Err(AgentError::Orchestration {
                message: "query must not be empty".to_string(),
            });
        }
        if query.len() > MAX_QUERY_LEN {
            return Err(AgentError::Orchestration {
                message: format!(
                    "query too long ({} bytes, max {MAX_QUERY_LEN})",
                    query.len()
                ),
            });
        }

        let start = Instant::now();
        let mut state = RunState {
            query,
            image: image.map(ImageAttachment::jpeg),
            retrieved: Vec::new(),
            steps: Vec::new(),
            history: history.iter().filter(|t| !t.synthetic).collect(),
        };

        // Retrieving
        state.steps.push(STEP_RETRIEVING.to_string());
        state.retrieved = store
            .retrieve(state.query, self.embedder.as_ref(), self.config.context_top_k)
            .await?;
        debug!(
            retrieved = state.retrieved.len(),
            pages = ?state.retrieved.iter().map(|c| c.chunk.page_number).collect::<Vec<_>>(),
            "retrieval complete"
        );

        // Generating
        if state.image.is_some() {
            state.steps.push(STEP_VISUAL.to_string());
        }
        let mut request = self.build_request(&mut state);
        let outcome = agentic_loop(
            self.provider.as_ref(),
            &mut request,
            &self.executor,
            self.config.max_tool_rounds,
        )
        .await?;

        // Done
        state.steps.extend(outcome.steps);
        let text = if outcome.response.content.trim().is_empty() {
            NO_RESPONSE.to_string()
        } else {
            outcome.response.content
        };

        info!(
            provider = self.provider.name(),
            tool_rounds = outcome.rounds,
            exhausted = outcome.exhausted,
            total_tokens = outcome.usage.total_tokens,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "answer generated"
        );

        Ok(AgentAnswer {
            cited_pages: cited_pages(&text),
            text,
            grounding: outcome.response.grounding,
            steps: state.steps,
            tool_rounds: outcome.rounds,
            usage: outcome.usage,
        })
    }

    /// Builds the first request: system instruction, history, new user turn.
    fn build_request(&self, state: &mut RunState<'_>) -> ChatRequest {
        let context = build_context(&state.retrieved);
        let instruction = build_system_instruction(&self.prompts.agent, &context, &self.tools);

        let mut messages = Vec::with_capacity(state.history.len() + 2);
        messages.push(system_message(&instruction));
        messages.extend(state.history.iter().map(|t| history_message(t)));
        messages.push(user_message_with_image(state.query, state.image.take()));

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: Some(self.config.max_tokens),
            json_mode: false,
            tools: self.tools.definitions().to_vec(),
            web_search: self.tools.web_search(),
        }
    }
}
