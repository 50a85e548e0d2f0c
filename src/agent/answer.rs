//! The answer returned by one orchestrator run.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::message::TokenUsage;
use crate::core::GroundingSource;

/// Text used when the model produced no answer text.
pub const NO_RESPONSE: &str = "No response generated.";

static PAGE_CITATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[\[Page\s+(\d+)\]\]").ok());

/// Final answer with citations and the agent's step log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentAnswer {
    /// Answer text (never empty).
    pub text: String,
    /// Web sources reported by the provider's native search.
    pub grounding: Vec<GroundingSource>,
    /// Ordered step log (retrieval, visual analysis, tool calls).
    pub steps: Vec<String>,
    /// Pages cited in the text with `[[Page N]]`.
    pub cited_pages: Vec<u32>,
    /// Tool rounds executed.
    pub tool_rounds: usize,
    /// Token usage across all provider calls.
    pub usage: TokenUsage,
}

/// Extracts the pages cited as `[[Page N]]`, deduplicated in order of
/// first appearance. Page 0 is not a valid citation and is skipped.
#[must_use]
pub fn cited_pages(text: &str) -> Vec<u32> {
    let Some(re) = PAGE_CITATION.as_ref() else {
        return Vec::new();
    };
    let mut pages = Vec::new();
    for caps in re.captures_iter(text) {
        if let Some(page) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok())
            && page > 0
            && !pages.contains(&page)
        {
            pages.push(page);
        }
    }
    pages
}
