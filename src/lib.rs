//! # scholar-lens
//!
//! Converse with a long, paginated document through a retrieval-augmented,
//! tool-using agent.
//!
//! A document arrives as text with a `--- Page N ---` marker before each
//! page. It is cut into overlapping per-page windows, each window is
//! embedded, and the vectors are kept in an in-memory store. Every user
//! message retrieves the most similar passages, grounds the model in them,
//! and lets the model call a small set of tools (Semantic Scholar search, a
//! calculator, and the provider's native web search) within a bounded number
//! of rounds. Answers cite their sources as `[[Page N]]`.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use scholar_lens::agent::{AgentConfig, Orchestrator, ToolExecutor, create_provider};
//! use scholar_lens::embedding::HashEmbedder;
//! use scholar_lens::session::Session;
//!
//! # async fn run() -> scholar_lens::Result<()> {
//! let config = AgentConfig::builder().from_env().build()?;
//! let provider = create_provider(&config)?;
//! let orchestrator = Orchestrator::new(
//!     provider,
//!     Arc::new(HashEmbedder::default()),
//!     ToolExecutor::default(),
//!     config,
//! );
//!
//! let text = "--- Page 1 ---\nThe sky is blue.\n--- Page 2 ---\nWater boils at 100C.";
//! let mut session = Session::index(text, orchestrator, true).await?;
//! let answer = session.send_message("What color is the sky?", None).await?;
//! assert!(!answer.text.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod core;
pub mod embedding;
pub mod error;
pub mod io;
pub mod session;
pub mod store;

pub use error::{Error, Result};
