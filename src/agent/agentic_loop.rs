//! Bounded agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! executes the first tool call in the response, appends the call and its
//! result, and repeats until the model answers without tool calls or the
//! round limit is reached. Hitting the limit is not an error; the loop ends
//! with whatever text the model produced last.

use tracing::debug;

use super::executor::{ToolExecutor, step_description};
use super::message::{
    ChatRequest, ChatResponse, TokenUsage, assistant_tool_calls_message, tool_message,
};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Result of one bounded loop run.
#[derive(Debug, Clone, Default)]
pub struct LoopOutcome {
    /// The last provider response.
    pub response: ChatResponse,
    /// Tool rounds executed.
    pub rounds: usize,
    /// One step-log line per executed tool call.
    pub steps: Vec<String>,
    /// Usage summed over every provider call.
    pub usage: TokenUsage,
    /// Whether the loop stopped with a tool request still pending.
    pub exhausted: bool,
}

/// Runs the loop: model → first tool call → tool result → model → …
///
/// Only the head of each round's tool-call list runs. Later calls in the
/// same round are dropped, so every round costs exactly one tool execution.
///
/// # Arguments
///
/// * `provider` - LLM provider to call.
/// * `request` - Initial chat request (mutated in-place with tool messages).
/// * `executor` - Dispatches tool calls to local tools.
/// * `max_rounds` - Maximum tool rounds; the provider is called at most
///   `max_rounds + 1` times.
///
/// # Errors
///
/// Propagates provider errors. Tool failures never abort the loop.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    executor: &ToolExecutor,
    max_rounds: usize,
) -> Result<LoopOutcome, AgentError> {
    let mut usage = TokenUsage::default();
    let mut steps = Vec::new();

    let mut response = provider.chat(request).await?;
    usage.accumulate(response.usage);

    let mut rounds = 0;
    while rounds < max_rounds {
        let Some(call) = response.tool_calls.first().cloned() else {
            debug!(rounds, "agentic loop completed with final text response");
            break;
        };
        rounds += 1;

        if response.tool_calls.len() > 1 {
            debug!(
                round = rounds,
                dropped = response.tool_calls.len() - 1,
                "executing first tool call only"
            );
        }

        steps.push(step_description(&call));
        let result = executor.execute(&call).await;
        debug!(
            round = rounds,
            tool = %call.name,
            call_id = %call.id,
            is_error = result.is_error,
            "tool execution complete"
        );

        let mut assistant = assistant_tool_calls_message(vec![call]);
        assistant.content = std::mem::take(&mut response.content);
        request.messages.push(assistant);
        request
            .messages
            .push(tool_message(&result.tool_call_id, &result.content));

        response = provider.chat(request).await?;
        usage.accumulate(response.usage);
    }

    let exhausted = !response.tool_calls.is_empty();
    if exhausted {
        debug!(max_rounds, "tool round limit reached; using last response text");
    }

    Ok(LoopOutcome {
        response,
        rounds,
        steps,
        usage,
        exhausted,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage, system_message, user_message};
    use crate::agent::tool::{CALCULATE_MATH, SEARCH_PAPERS, ToolCall};
    use crate::agent::tools::{PaperRecord, PaperSearch};
    use crate::error::AgentError;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    struct NoPapers;

    #[async_trait]
    impl PaperSearch for NoPapers {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<PaperRecord>, AgentError> {
            Ok(Vec::new())
        }
    }

    /// Mock provider that returns tool calls on the first N calls,
    /// then a final text response.
    struct MockToolProvider {
        call_count: AtomicUsize,
        tool_rounds: usize,
        calls_per_round: usize,
    }

    impl MockToolProvider {
        fn new(tool_rounds: usize) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                tool_rounds,
                calls_per_round: 1,
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for MockToolProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            let count = self.call_count.fetch_add(1, Ordering::SeqCst);
            let usage = TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 2,
                total_tokens: 12,
            };

            if count < self.tool_rounds {
                let tool_calls = (0..self.calls_per_round)
                    .map(|i| ToolCall {
                        id: format!("call_{count}_{i}"),
                        name: (if i == 0 { CALCULATE_MATH } else { SEARCH_PAPERS }).to_string(),
                        arguments: format!(r#"{{"expression":"{count}+1","query":"q"}}"#),
                        signature: None,
                    })
                    .collect();
                Ok(ChatResponse {
                    content: format!("working {count}"),
                    usage,
                    tool_calls,
                    finish_reason: Some("tool_calls".to_string()),
                    grounding: Vec::new(),
                })
            } else {
                Ok(ChatResponse {
                    content: "Final answer based on tool results.".to_string(),
                    usage,
                    tool_calls: Vec::new(),
                    finish_reason: Some("stop".to_string()),
                    grounding: Vec::new(),
                })
            }
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test".to_string(),
            messages: vec![system_message("You are a test agent."), user_message("query")],
            temperature: None,
            max_tokens: Some(1024),
            json_mode: false,
            tools: Vec::new(),
            web_search: false,
        }
    }

    fn executor() -> ToolExecutor {
        ToolExecutor::new(Arc::new(NoPapers))
    }

    #[tokio::test]
    async fn test_single_tool_round() {
        let provider = MockToolProvider::new(1);
        let mut request = request();

        let outcome = agentic_loop(&provider, &mut request, &executor(), 3)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.response.content, "Final answer based on tool results.");
        assert_eq!(outcome.rounds, 1);
        assert!(!outcome.exhausted);
        assert_eq!(outcome.steps, vec!["Calculating 0+1...".to_string()]);
        // system + user + assistant(tool_call) + tool(result)
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[3].content, "Calculated Result: 1");
        assert_eq!(outcome.usage.total_tokens, 24);
    }

    #[tokio::test]
    async fn test_multiple_rounds() {
        let provider = MockToolProvider::new(3);
        let mut request = request();

        let outcome = agentic_loop(&provider, &mut request, &executor(), 3)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.response.content, "Final answer based on tool results.");
        assert_eq!(outcome.rounds, 3);
        assert!(!outcome.exhausted);
        // 2 initial + 3 rounds * 2 (assistant + tool)
        assert_eq!(request.messages.len(), 8);
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn test_bound_returns_last_text() {
        // Provider always asks for a tool.
        let provider = MockToolProvider::new(usize::MAX);
        let mut request = request();

        let outcome = agentic_loop(&provider, &mut request, &executor(), 3)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.rounds, 3);
        assert!(outcome.exhausted);
        assert_eq!(provider.calls(), 4);
        assert_eq!(outcome.response.content, "working 3");
        assert_eq!(outcome.steps.len(), 3);
    }

    #[tokio::test]
    async fn test_only_first_call_executes() {
        let provider = MockToolProvider {
            call_count: AtomicUsize::new(0),
            tool_rounds: 1,
            calls_per_round: 3,
        };
        let mut request = request();

        let outcome = agentic_loop(&provider, &mut request, &executor(), 3)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.steps.len(), 1);
        let assistant = &request.messages[2];
        assert_eq!(assistant.tool_calls.len(), 1);
        assert_eq!(assistant.tool_calls[0].name, CALCULATE_MATH);
        assert_eq!(assistant.content, "working 0");
        assert_eq!(request.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_no_tools() {
        let provider = MockToolProvider::new(0);
        let mut request = request();

        let outcome = agentic_loop(&provider, &mut request, &executor(), 3)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.response.content, "Final answer based on tool results.");
        assert_eq!(outcome.rounds, 0);
        assert!(outcome.steps.is_empty());
        assert_eq!(request.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        struct Failing;

        #[async_trait]
        impl LlmProvider for Failing {
            fn name(&self) -> &'static str {
                "failing"
            }

            async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
                Err(AgentError::ApiRequest {
                    message: "503".to_string(),
                    status: Some(503),
                })
            }
        }

        let result = agentic_loop(&Failing, &mut request(), &executor(), 3).await;
        assert!(matches!(result, Err(AgentError::ApiRequest { .. })));
    }
}
