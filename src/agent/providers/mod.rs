//! Concrete [`LlmProvider`](super::provider::LlmProvider) implementations.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
