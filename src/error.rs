//! Error types for scholar-lens.
//!
//! Each layer owns a `thiserror` enum. The top-level [`Error`] wraps them so
//! CLI commands can propagate any failure with `?`.

use thiserror::Error;

/// Result alias using the crate-wide [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Chunking configuration or input error.
    #[error(transparent)]
    Chunking(#[from] ChunkingError),

    /// Embedding provider error.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Agent, provider, or orchestration error.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// CLI command error.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while configuring or running the chunker.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Window parameters would not make progress.
    #[error("invalid chunker configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },
}

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The provider request failed (network, auth, quota).
    #[error("embedding request failed ({provider}): {message}")]
    Request {
        /// Provider name.
        provider: &'static str,
        /// Failure description.
        message: String,
    },

    /// The provider answered without a usable vector.
    #[error("embedding provider {provider} returned no vector")]
    EmptyVector {
        /// Provider name.
        provider: &'static str,
    },

    /// The configured embedder is unknown or was not compiled in.
    #[error("unsupported embedder: {name}")]
    Unsupported {
        /// Requested embedder name.
        name: String,
    },

    /// A required credential is missing.
    #[error("API key missing for embedder {provider}")]
    ApiKeyMissing {
        /// Provider name.
        provider: &'static str,
    },
}

/// Errors raised by the agent system.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured.
    #[error("API key missing. Set GEMINI_API_KEY, OPENAI_API_KEY, or LENS_API_KEY")]
    ApiKeyMissing,

    /// The generation provider request failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Failure description.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The provider response could not be interpreted.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// Failure description.
        message: String,
        /// Raw content that failed to parse.
        content: String,
    },

    /// Query embedding failed, so no grounding context can be built.
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] EmbeddingError),

    /// A tool failed while executing.
    ///
    /// Never escapes [`ToolExecutor`](crate::agent::executor::ToolExecutor);
    /// its display string becomes the tool result.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// The requested provider is not supported.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Requested provider name.
        name: String,
    },

    /// Invalid input or inconsistent state in the orchestrator.
    #[error("{message}")]
    Orchestration {
        /// Failure description.
        message: String,
    },
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Invalid argument value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The command could not complete.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be rendered.
    #[error("output format error: {0}")]
    OutputFormat(String),
}
