//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::chunking::ChunkerConfig;
use crate::error::AgentError;
use crate::store::IndexConfig;

/// Default number of chunks placed in the grounding context.
pub const DEFAULT_CONTEXT_TOP_K: usize = 4;
/// Default maximum tool-call rounds per user message.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 3;
/// Default answer max tokens.
const DEFAULT_MAX_TOKENS: u32 = 2048;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default Gemini model for answers and insights.
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
/// Default `OpenAI` model for answers and insights.
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Configuration for the document agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Generation provider name (`"gemini"` or `"openai"`).
    pub provider: String,
    /// API key for the provider (also used by remote embedders).
    pub api_key: Option<String>,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model answering user messages.
    pub model: String,
    /// Model producing document insights.
    pub insights_model: String,
    /// Embedding backend name (`"hash"`, `"gemini"`, `"openai"`, `"fastembed"`).
    pub embedder: String,
    /// Embedding model override for remote embedders.
    pub embedding_model: Option<String>,
    /// Chunks retrieved into the grounding context per message.
    pub context_top_k: usize,
    /// Maximum tool-call rounds per message.
    pub max_tool_rounds: usize,
    /// Maximum tokens per answer.
    pub max_tokens: u32,
    /// Sampling temperature, provider default when unset.
    pub temperature: Option<f32>,
    /// Request timeout.
    pub timeout: Duration,
    /// Directory containing prompt template files.
    ///
    /// Missing files fall back to the compiled-in defaults.
    pub prompt_dir: Option<PathBuf>,
    /// Keep only the most recent N turns in provider history.
    ///
    /// `None` replays the whole conversation.
    pub max_history_turns: Option<usize>,
    /// Chunking and filtering parameters for indexing.
    pub index: IndexConfig,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] if a numeric setting is out of range.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// Returns the API key or [`AgentError::ApiKeyMissing`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no key was configured.
    pub fn require_api_key(&self) -> Result<&str, AgentError> {
        self.api_key.as_deref().ok_or(AgentError::ApiKeyMissing)
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    insights_model: Option<String>,
    embedder: Option<String>,
    embedding_model: Option<String>,
    context_top_k: Option<usize>,
    max_tool_rounds: Option<usize>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
    prompt_dir: Option<PathBuf>,
    max_history_turns: Option<usize>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    min_chunk_chars: Option<usize>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("LENS_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            let provider = self.provider.as_deref().unwrap_or("gemini");
            let primary = if provider == "openai" {
                "OPENAI_API_KEY"
            } else {
                "GEMINI_API_KEY"
            };
            self.api_key = std::env::var(primary)
                .or_else(|_| std::env::var("LENS_API_KEY"))
                .ok()
                .filter(|k| !k.is_empty());
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("LENS_BASE_URL").ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("LENS_MODEL").ok();
        }
        if self.insights_model.is_none() {
            self.insights_model = std::env::var("LENS_INSIGHTS_MODEL").ok();
        }
        if self.embedder.is_none() {
            self.embedder = std::env::var("LENS_EMBEDDER").ok();
        }
        if self.embedding_model.is_none() {
            self.embedding_model = std::env::var("LENS_EMBEDDING_MODEL").ok();
        }
        if self.context_top_k.is_none() {
            self.context_top_k = env_parse("LENS_CONTEXT_TOP_K");
        }
        if self.max_tool_rounds.is_none() {
            self.max_tool_rounds = env_parse("LENS_MAX_TOOL_ROUNDS");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("LENS_PROMPT_DIR").ok().map(PathBuf::from);
        }
        if self.max_history_turns.is_none() {
            self.max_history_turns = env_parse("LENS_MAX_HISTORY_TURNS");
        }
        if self.chunk_size.is_none() {
            self.chunk_size = env_parse("LENS_CHUNK_SIZE");
        }
        if self.chunk_overlap.is_none() {
            self.chunk_overlap = env_parse("LENS_CHUNK_OVERLAP");
        }
        if self.min_chunk_chars.is_none() {
            self.min_chunk_chars = env_parse("LENS_MIN_CHUNK_CHARS");
        }
        self
    }

    /// Sets the generation provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the answering model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the insights model.
    #[must_use]
    pub fn insights_model(mut self, model: impl Into<String>) -> Self {
        self.insights_model = Some(model.into());
        self
    }

    /// Sets the embedding backend.
    #[must_use]
    pub fn embedder(mut self, name: impl Into<String>) -> Self {
        self.embedder = Some(name.into());
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Sets how many chunks are retrieved per message.
    #[must_use]
    pub const fn context_top_k(mut self, n: usize) -> Self {
        self.context_top_k = Some(n);
        self
    }

    /// Sets the maximum tool-call rounds per message.
    #[must_use]
    pub const fn max_tool_rounds(mut self, n: usize) -> Self {
        self.max_tool_rounds = Some(n);
        self
    }

    /// Sets the answer max tokens.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Limits provider history to the most recent `n` turns.
    #[must_use]
    pub const fn max_history_turns(mut self, n: usize) -> Self {
        self.max_history_turns = Some(n);
        self
    }

    /// Sets the chunk window size.
    #[must_use]
    pub const fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = Some(n);
        self
    }

    /// Sets the overlap between consecutive windows.
    #[must_use]
    pub const fn chunk_overlap(mut self, n: usize) -> Self {
        self.chunk_overlap = Some(n);
        self
    }

    /// Sets the minimum trimmed chunk length worth embedding.
    #[must_use]
    pub const fn min_chunk_chars(mut self, n: usize) -> Self {
        self.min_chunk_chars = Some(n);
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// An API key is not required here; providers that need one fail at
    /// construction instead, so offline commands keep working.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] if `context_top_k` or
    /// `max_tool_rounds` is zero.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let provider = self.provider.unwrap_or_else(|| "gemini".to_string());
        let default_model = if provider == "openai" {
            DEFAULT_OPENAI_MODEL
        } else {
            DEFAULT_GEMINI_MODEL
        };

        let context_top_k = self.context_top_k.unwrap_or(DEFAULT_CONTEXT_TOP_K);
        if context_top_k == 0 {
            return Err(AgentError::Orchestration {
                message: "context_top_k must be greater than zero".to_string(),
            });
        }
        let max_tool_rounds = self.max_tool_rounds.unwrap_or(DEFAULT_MAX_TOOL_ROUNDS);
        if max_tool_rounds == 0 {
            return Err(AgentError::Orchestration {
                message: "max_tool_rounds must be greater than zero".to_string(),
            });
        }

        let defaults = IndexConfig::default();
        let index = IndexConfig {
            chunker: ChunkerConfig {
                chunk_size: self.chunk_size.unwrap_or(defaults.chunker.chunk_size),
                overlap: self.chunk_overlap.unwrap_or(defaults.chunker.overlap),
            },
            min_chunk_chars: self.min_chunk_chars.unwrap_or(defaults.min_chunk_chars),
        };

        Ok(AgentConfig {
            model: self.model.unwrap_or_else(|| default_model.to_string()),
            insights_model: self
                .insights_model
                .unwrap_or_else(|| default_model.to_string()),
            provider,
            api_key: self.api_key,
            base_url: self.base_url,
            embedder: self.embedder.unwrap_or_else(|| "hash".to_string()),
            embedding_model: self.embedding_model,
            context_top_k,
            max_tool_rounds,
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self.temperature,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            prompt_dir: self.prompt_dir,
            max_history_turns: self.max_history_turns,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.embedder, "hash");
        assert_eq!(config.context_top_k, DEFAULT_CONTEXT_TOP_K);
        assert_eq!(config.max_tool_rounds, DEFAULT_MAX_TOOL_ROUNDS);
        assert!(config.api_key.is_none());
        assert!(config.max_history_turns.is_none());
        assert_eq!(config.index, IndexConfig::default());
    }

    #[test]
    fn test_require_api_key() {
        let config = AgentConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            config.require_api_key(),
            Err(AgentError::ApiKeyMissing)
        ));

        let config = AgentConfig::builder()
            .api_key("k")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.require_api_key().ok(), Some("k"));
    }

    #[test]
    fn test_openai_default_model() {
        let config = AgentConfig::builder()
            .provider("openai")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.insights_model, DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .model("gemini-2.0-pro")
            .context_top_k(8)
            .max_tool_rounds(5)
            .max_history_turns(10)
            .chunk_size(500)
            .chunk_overlap(50)
            .min_chunk_chars(10)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.model, "gemini-2.0-pro");
        assert_eq!(config.insights_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.context_top_k, 8);
        assert_eq!(config.max_tool_rounds, 5);
        assert_eq!(config.max_history_turns, Some(10));
        assert_eq!(config.index.chunker.chunk_size, 500);
        assert_eq!(config.index.chunker.overlap, 50);
        assert_eq!(config.index.min_chunk_chars, 10);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_rejects_zero_bounds() {
        assert!(AgentConfig::builder().context_top_k(0).build().is_err());
        assert!(AgentConfig::builder().max_tool_rounds(0).build().is_err());
    }
}
