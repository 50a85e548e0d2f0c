//! Tool type definitions for function-calling.
//!
//! Provides provider-agnostic types for tool definitions, calls, and results.
//! The declarations are built once and shared read-only by every
//! conversation.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Name of the bibliographic search tool.
pub const SEARCH_PAPERS: &str = "search_semantic_scholar";
/// Name of the calculator tool.
pub const CALCULATE_MATH: &str = "calculate_math";

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match dispatch table in executor).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider or adapter).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
    /// Opaque provider token that must be echoed back with this call
    /// (Gemini `thoughtSignature`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Name of the tool that ran.
    pub name: String,
    /// Result text fed back to the model (error description on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

/// The tool catalog offered to the model.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
    web_search: bool,
}

impl ToolSet {
    /// Returns the function tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Whether the provider's native web search is offered.
    #[must_use]
    pub const fn web_search(&self) -> bool {
        self.web_search
    }

    /// Returns `true` if this set offers no tools at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty() && !self.web_search
    }

    /// Returns the number of function tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Looks up a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Tool set for the document agent: paper search, calculator, and
    /// native web search.
    #[must_use]
    pub fn agent_tools() -> Self {
        Self {
            definitions: vec![def_search_papers(), def_calculate_math()],
            web_search: true,
        }
    }

    /// Empty tool set (no tools available).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Tool schema definitions
// ---------------------------------------------------------------------------

/// Defines the paper search tool.
fn def_search_papers() -> ToolDefinition {
    ToolDefinition {
        name: SEARCH_PAPERS.to_string(),
        description: "Search for related research papers, citations, or previous work."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Keywords to search for"
                }
            },
            "required": ["query"]
        }),
    }
}

/// Defines the calculator tool.
fn def_calculate_math() -> ToolDefinition {
    ToolDefinition {
        name: CALCULATE_MATH.to_string(),
        description: "Perform exact mathematical calculations (e.g. averages from tables)."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The math expression to evaluate (e.g. (23+45)/2)"
                }
            },
            "required": ["expression"]
        }),
    }
}
