//! Tool executor that dispatches model tool calls to local implementations.
//!
//! Every failure (unknown tool, bad arguments, network error) is folded into
//! the returned [`ToolResult`] so it can be fed back to the model as context.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::tool::{CALCULATE_MATH, SEARCH_PAPERS, ToolCall, ToolResult};
use super::tools::calculator;
use super::tools::scholar::{
    DEFAULT_PAPER_LIMIT, PaperSearch, SemanticScholarClient, format_papers,
};
use crate::error::AgentError;

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;
/// Maximum query length forwarded to the paper search API.
const MAX_QUERY_LEN: usize = 500;

/// Executes tool calls requested by the model.
pub struct ToolExecutor {
    papers: Arc<dyn PaperSearch>,
    paper_limit: usize,
}

impl ToolExecutor {
    /// Creates an executor backed by the given paper search capability.
    #[must_use]
    pub fn new(papers: Arc<dyn PaperSearch>) -> Self {
        Self {
            papers,
            paper_limit: DEFAULT_PAPER_LIMIT,
        }
    }

    /// Overrides how many papers a search returns.
    #[must_use]
    pub const fn with_paper_limit(mut self, limit: usize) -> Self {
        self.paper_limit = limit;
        self
    }

    /// Dispatches a tool call to the matching implementation.
    ///
    /// Validates raw argument size before dispatch to prevent oversized payloads.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return ToolResult {
                tool_call_id: call.id.clone(),
                name: call.name.clone(),
                content: format!(
                    "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
                is_error: true,
            };
        }

        let result = match call.name.as_str() {
            SEARCH_PAPERS => self.tool_search_papers(&call.arguments).await,
            CALCULATE_MATH => Self::tool_calculate(&call.arguments),
            other => Err(AgentError::ToolExecution {
                name: other.to_string(),
                message: "unknown tool".to_string(),
            }),
        };

        match result {
            Ok((content, is_error)) => {
                debug!(tool = %call.name, is_error, "tool executed");
                ToolResult {
                    tool_call_id: call.id.clone(),
                    name: call.name.clone(),
                    content,
                    is_error,
                }
            }
            Err(e) => {
                debug!(tool = %call.name, error = %e, "tool failed");
                ToolResult {
                    tool_call_id: call.id.clone(),
                    name: call.name.clone(),
                    content: e.to_string(),
                    is_error: true,
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tool implementations
    // -----------------------------------------------------------------------

    /// Searches for related papers. Network failures become result text.
    async fn tool_search_papers(&self, args: &str) -> Result<(String, bool), AgentError> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
        }
        let args: Args = parse_args(SEARCH_PAPERS, args)?;

        let query = args.query.trim();
        if query.is_empty() {
            return Err(AgentError::ToolExecution {
                name: SEARCH_PAPERS.to_string(),
                message: "query must not be empty".to_string(),
            });
        }
        if query.len() > MAX_QUERY_LEN {
            return Err(AgentError::ToolExecution {
                name: SEARCH_PAPERS.to_string(),
                message: format!("query too long ({} bytes, max {MAX_QUERY_LEN})", query.len()),
            });
        }

        match self.papers.search(query, self.paper_limit).await {
            Ok(mut papers) => {
                papers.truncate(self.paper_limit);
                Ok((format_papers(&papers), false))
            }
            Err(e) => Ok((
                format!("Error connecting to Semantic Scholar API: {}", error_detail(&e)),
                true,
            )),
        }
    }

    /// Evaluates an arithmetic expression.
    fn tool_calculate(args: &str) -> Result<(String, bool), AgentError> {
        #[derive(Deserialize)]
        struct Args {
            expression: String,
        }
        let args: Args = parse_args(CALCULATE_MATH, args)?;
        let is_error = calculator::evaluate(&args.expression).is_err();
        Ok((calculator::calculate(&args.expression), is_error))
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new(Arc::new(SemanticScholarClient::new()))
    }
}

/// Returns the step-log line describing a tool call.
#[must_use]
pub fn step_description(call: &ToolCall) -> String {
    let arg = |key: &str| -> String {
        serde_json::from_str::<serde_json::Value>(&call.arguments)
            .ok()
            .and_then(|v| v.get(key).and_then(|s| s.as_str().map(str::to_string)))
            .unwrap_or_default()
    };
    match call.name.as_str() {
        SEARCH_PAPERS => format!("Searching Semantic Scholar for \"{}\"...", arg("query")),
        CALCULATE_MATH => format!("Calculating {}...", arg("expression")),
        other => format!("Calling {other}..."),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, args: &str) -> Result<T, AgentError> {
    serde_json::from_str(args).map_err(|e| AgentError::ToolExecution {
        name: tool.to_string(),
        message: format!("invalid arguments: {e}"),
    })
}

fn error_detail(error: &AgentError) -> String {
    match error {
        AgentError::ToolExecution { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
