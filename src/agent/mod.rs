//! Conversational document agent.
//!
//! Answers questions about one indexed document with a pluggable generation
//! provider (Gemini or `OpenAI`-compatible), grounding every answer in the
//! retrieved passages and letting the model call a small set of tools.
//!
//! # Architecture
//!
//! ```text
//! User message → Orchestrator
//!   ├── VectorStore::retrieve (top-k passages)
//!   ├── System instruction ({tools} + {context})
//!   ├── agentic_loop (≤ max_tool_rounds)
//!   │   └── ToolExecutor → search_semantic_scholar | calculate_math
//!   └── AgentAnswer (text, [[Page N]] citations, steps, grounding)
//!
//! Document text → InsightsAgent (JSON mode) → PaperInsights
//! ```

pub mod agentic_loop;
pub mod answer;
pub mod client;
pub mod config;
pub mod executor;
pub mod insights;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod tool;
pub mod tools;
pub mod traits;

// Re-export key types
pub use answer::AgentAnswer;
pub use client::create_provider;
pub use config::AgentConfig;
pub use executor::ToolExecutor;
pub use insights::{InsightConcept, InsightsAgent, PaperInsights};
pub use message::{ChatMessage, ChatRequest, ChatResponse, ImageAttachment, Role, TokenUsage};
pub use orchestrator::Orchestrator;
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolSet};
pub use traits::{Agent, AgentResponse};
