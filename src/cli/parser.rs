//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::session::ExplainLevel;

/// scholar-lens: converse with long documents.
///
/// Indexes page-delimited text (`--- Page N ---` markers) into an in-memory
/// vector store and answers questions with page citations, calling
/// Semantic Scholar and a calculator when needed.
#[derive(Parser, Debug)]
#[command(name = "scholar-lens")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose (debug) logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Directory containing prompt template files.
    #[arg(long, env = "LENS_PROMPT_DIR", global = true)]
    pub prompt_dir: Option<PathBuf>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Audience level accepted by `explain`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelArg {
    /// Plain-language explanation.
    HighSchool,
    /// Expert-level explanation.
    Phd,
}

impl From<LevelArg> for ExplainLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::HighSchool => Self::HighSchool,
            LevelArg::Phd => Self::PhD,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the pages recovered from a document.
    Pages {
        /// Page-delimited text file.
        file: PathBuf,
    },

    /// Show the windows the chunker cuts from a document.
    #[command(after_help = r#"Examples:
  scholar-lens chunk paper.txt                    # Default 1000/200 windows
  scholar-lens chunk paper.txt --preview          # Include text preview
  scholar-lens --format json chunk paper.txt | jq '.[].page'
"#)]
    Chunk {
        /// Page-delimited text file.
        file: PathBuf,

        /// Include a text preview per window.
        #[arg(short, long)]
        preview: bool,

        /// Preview length in characters.
        #[arg(long, default_value = "80")]
        preview_len: usize,
    },

    /// Index a document and report what was stored.
    Index {
        /// Page-delimited text file.
        file: PathBuf,
    },

    /// Rank a document's chunks against a query.
    #[command(after_help = r#"Examples:
  scholar-lens search paper.txt "attention mechanism"
  scholar-lens search paper.txt "results table" -k 2
  LENS_EMBEDDER=hash scholar-lens search paper.txt "sky"   # Offline
"#)]
    Search {
        /// Page-delimited text file.
        file: PathBuf,

        /// Search query text.
        query: String,

        /// Maximum number of results.
        #[arg(short = 'k', long, default_value = "4")]
        top_k: usize,
    },

    /// Ask the agent a question about a document.
    #[command(after_help = r#"Examples:
  scholar-lens ask paper.txt "What is the main contribution?"
  scholar-lens ask paper.txt "Explain this figure" --image page3.jpg
  scholar-lens ask paper.txt "Find related work" --no-insights
  scholar-lens ask paper.txt "Summarize" --export notes.md
"#)]
    Ask {
        /// Page-delimited text file.
        file: PathBuf,

        /// The question.
        question: String,

        /// JPEG image of a page to attach.
        #[arg(long)]
        image: Option<PathBuf>,

        /// Skip the document analysis step (no title or summary).
        #[arg(long)]
        no_insights: bool,

        /// Write the conversation as markdown to this file.
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Extract title, summary, outline, key points, and concepts.
    Insights {
        /// Page-delimited text file.
        file: PathBuf,
    },

    /// Explain a passage at a chosen level.
    Explain {
        /// Page-delimited text file.
        file: PathBuf,

        /// The passage to explain.
        selection: String,

        /// Audience level.
        #[arg(short, long, value_enum, default_value = "high-school")]
        level: LevelArg,
    },

    /// Evaluate an arithmetic expression with the calculator tool.
    Calc {
        /// Expression, e.g. "(23 + 45) / 2".
        expression: String,
    },

    /// Write default prompt templates to a directory.
    ///
    /// Existing files are not overwritten.
    InitPrompts {
        /// Target directory (default: ~/.config/scholar-lens/prompts).
        dir: Option<PathBuf>,
    },
}
