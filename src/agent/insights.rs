//! Document insights agent.
//!
//! Asks the model for a structural overview of the document (title, summary,
//! outline, key points, concept map) in JSON mode. Only the head of the
//! document is sent.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::config::AgentConfig;
use super::prompt::build_insights_prompt;
use super::provider::LlmProvider;
use super::traits::{Agent, AgentResponse};
use crate::error::AgentError;

/// Characters of document text sent for analysis.
pub const INSIGHTS_INPUT_CHARS: usize = 50_000;
/// Title used when the model did not provide one.
pub const UNTITLED: &str = "Untitled";
/// Title recorded when the analysis itself failed.
pub const FAILED_TITLE: &str = "Error";
/// Summary recorded when the analysis itself failed.
pub const FAILED_SUMMARY: &str = "Analysis failed";

static CODE_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:json)?\s*(.*?)\s*```").ok());

/// Reads an explicit JSON `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A concept and its relations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsightConcept {
    /// Concept name.
    #[serde(deserialize_with = "null_as_default")]
    pub concept: String,
    /// What the concept means in this document.
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    /// Names of related concepts.
    #[serde(deserialize_with = "null_as_default")]
    pub related_to: Vec<String>,
}

/// Structural overview of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaperInsights {
    /// Document title.
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    /// Short summary.
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,
    /// Section or argument outline.
    #[serde(deserialize_with = "null_as_default")]
    pub outline: Vec<String>,
    /// Key findings or claims.
    #[serde(deserialize_with = "null_as_default")]
    pub key_points: Vec<String>,
    /// Concept map.
    #[serde(deserialize_with = "null_as_default")]
    pub concepts: Vec<InsightConcept>,
}

impl Default for PaperInsights {
    fn default() -> Self {
        Self {
            title: UNTITLED.to_string(),
            summary: String::new(),
            outline: Vec::new(),
            key_points: Vec::new(),
            concepts: Vec::new(),
        }
    }
}

impl PaperInsights {
    /// Insights recorded when analysis could not produce a result.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            title: FAILED_TITLE.to_string(),
            summary: FAILED_SUMMARY.to_string(),
            ..Self::default()
        }
    }
}

/// Agent that extracts [`PaperInsights`] from document text.
pub struct InsightsAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl InsightsAgent {
    /// Creates a new insights agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.insights_model.clone(),
            max_tokens: config.max_tokens.max(4096),
            system_prompt,
        }
    }

    /// Analyzes the first [`INSIGHTS_INPUT_CHARS`] characters of `text`.
    ///
    /// With `lenient`, unparsable output degrades to
    /// [`PaperInsights::failed`] instead of an error.
    ///
    /// # Errors
    ///
    /// Returns provider errors, and [`AgentError::ResponseParse`] for
    /// unparsable output when not lenient.
    pub async fn analyze(
        &self,
        provider: &dyn LlmProvider,
        text: &str,
        lenient: bool,
    ) -> Result<(PaperInsights, AgentResponse), AgentError> {
        let head: String = text.chars().take(INSIGHTS_INPUT_CHARS).collect();
        let response = self.execute(provider, &build_insights_prompt(&head)).await?;
        let insights = Self::parse_insights(&response.content, lenient)?;
        Ok((insights, response))
    }

    /// Parses the agent's JSON response, tolerating a surrounding code fence.
    fn parse_insights(content: &str, lenient: bool) -> Result<PaperInsights, AgentError> {
        let json_str = CODE_FENCE
            .as_ref()
            .and_then(|re| re.captures(content))
            .and_then(|caps| caps.get(1))
            .map_or_else(|| content.trim(), |m| m.as_str());

        match serde_json::from_str::<PaperInsights>(json_str) {
            Ok(mut insights) => {
                if insights.title.trim().is_empty() {
                    insights.title = UNTITLED.to_string();
                }
                Ok(insights)
            }
            Err(e) if lenient => {
                warn!(error = %e, "unparsable insights, recording failure");
                Ok(PaperInsights::failed())
            }
            Err(e) => Err(AgentError::ResponseParse {
                message: format!("Failed to parse insights: {e}"),
                content: content.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Agent for InsightsAgent {
    fn name(&self) -> &'static str {
        "insights"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
