//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Commands are
//! synchronous; the ones that embed or generate build a tokio runtime and
//! block on it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;

use crate::agent::client::create_provider;
use crate::agent::config::AgentConfig;
use crate::agent::insights::InsightsAgent;
use crate::agent::orchestrator::Orchestrator;
use crate::agent::prompt::PromptSet;
use crate::agent::tools::calculator::{evaluate, format_number};
use crate::agent::ToolExecutor;
use crate::chunking::Chunker;
use crate::cli::output::{
    OutputFormat, format_answer, format_chunks, format_index_stats, format_insights,
    format_pages, format_search_results,
};
use crate::cli::parser::{Cli, Commands};
use crate::embedding::{Embedder, create_embedder};
use crate::error::{CommandError, Result};
use crate::io::{read_document, read_image_base64};
use crate::session::{ExplainLevel, Session};
use crate::store::VectorStore;

/// Parameters for the `ask` and `explain` commands.
#[derive(Debug, Clone)]
pub struct AskParams<'a> {
    /// Document path.
    pub file: &'a Path,
    /// What to send to the agent.
    pub message: AskMessage<'a>,
    /// Optional page image path.
    pub image: Option<&'a Path>,
    /// Run document analysis first.
    pub with_insights: bool,
    /// Markdown export target.
    pub export: Option<&'a Path>,
}

/// The user message an [`AskParams`] run sends.
#[derive(Debug, Clone, Copy)]
pub enum AskMessage<'a> {
    /// A free-form question.
    Question(&'a str),
    /// A passage to explain at a level.
    Explain(&'a str, ExplainLevel),
}

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let prompt_dir = cli.prompt_dir.as_deref();

    match &cli.command {
        Commands::Pages { file } => cmd_pages(file, format),
        Commands::Chunk {
            file,
            preview,
            preview_len,
        } => cmd_chunk(file, *preview, *preview_len, format),
        Commands::Index { file } => cmd_index(file, format),
        Commands::Search { file, query, top_k } => cmd_search(file, query, *top_k, format),
        Commands::Ask {
            file,
            question,
            image,
            no_insights,
            export,
        } => {
            let params = AskParams {
                file,
                message: AskMessage::Question(question),
                image: image.as_deref(),
                with_insights: !no_insights,
                export: export.as_deref(),
            };
            cmd_ask(&params, prompt_dir, format)
        }
        Commands::Insights { file } => cmd_insights(file, prompt_dir, format),
        Commands::Explain {
            file,
            selection,
            level,
        } => {
            let params = AskParams {
                file,
                message: AskMessage::Explain(selection, (*level).into()),
                image: None,
                with_insights: false,
                export: None,
            };
            cmd_ask(&params, prompt_dir, format)
        }
        Commands::Calc { expression } => cmd_calc(expression, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Loads configuration from the environment, applying CLI overrides.
fn load_config(prompt_dir: Option<&Path>) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder().from_env();
    if let Some(dir) = prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    builder.build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into()
    })
}

fn load_embedder(config: &AgentConfig) -> Result<Arc<dyn Embedder>> {
    let embedder = create_embedder(config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Embedder creation failed: {e}"))
    })?;
    Ok(Arc::from(embedder))
}

/// Creates the tokio runtime used as the sync/async bridge.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

fn chunker(config: &AgentConfig) -> Result<Chunker> {
    Ok(Chunker::new(config.index.chunker)?)
}

fn cmd_pages(file: &Path, format: OutputFormat) -> Result<String> {
    let text = read_document(file)?;
    let config = load_config(None)?;
    let pages = chunker(&config)?.split_pages(&text);
    Ok(format_pages(&pages, format))
}

fn cmd_chunk(file: &Path, preview: bool, preview_len: usize, format: OutputFormat) -> Result<String> {
    let text = read_document(file)?;
    let config = load_config(None)?;
    let chunks = chunker(&config)?.chunk(&text);
    Ok(format_chunks(&chunks, preview, preview_len, format))
}

fn cmd_index(file: &Path, format: OutputFormat) -> Result<String> {
    let text = read_document(file)?;
    let config = load_config(None)?;
    let embedder = load_embedder(&config)?;

    let (_, stats) = runtime()?.block_on(VectorStore::build(&text, embedder.as_ref(), &config.index))?;
    Ok(format_index_stats(&stats, embedder.name(), format))
}

fn cmd_search(file: &Path, query: &str, top_k: usize, format: OutputFormat) -> Result<String> {
    if query.trim().is_empty() {
        return Err(CommandError::InvalidArgument("query must not be empty".to_string()).into());
    }
    let text = read_document(file)?;
    let config = load_config(None)?;
    let embedder = load_embedder(&config)?;

    let results = runtime()?.block_on(async {
        let (store, _) = VectorStore::build(&text, embedder.as_ref(), &config.index).await?;
        let results = store.retrieve(query, embedder.as_ref(), top_k).await?;
        Ok::<_, crate::error::Error>(results)
    })?;
    Ok(format_search_results(&results, format))
}

fn cmd_ask(params: &AskParams<'_>, prompt_dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let text = read_document(params.file)?;
    let image = params.image.map(read_image_base64).transpose()?;
    let config = load_config(prompt_dir)?;
    let embedder = load_embedder(&config)?;
    let provider = create_provider(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;
    let orchestrator = Orchestrator::new(provider, embedder, ToolExecutor::default(), config);

    let (answer, session) = runtime()?.block_on(async {
        let mut session = Session::index(&text, orchestrator, params.with_insights).await?;
        let result = match params.message {
            AskMessage::Question(q) => session.send_message(q, image).await,
            AskMessage::Explain(selection, level) => {
                session.explain_selection(selection, level).await
            }
        };
        Ok::<_, crate::error::Error>((result, session))
    })?;

    if let Some(path) = params.export {
        write_export(path, &session.export_markdown())?;
    }

    let answer = answer
        .map_err(|e| CommandError::ExecutionFailed(format!("Query failed: {e}")))?;
    Ok(format_answer(&answer, format))
}

fn write_export(path: &Path, markdown: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, markdown)?;
    Ok(())
}

fn cmd_insights(file: &Path, prompt_dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let text = read_document(file)?;
    let config = load_config(prompt_dir)?;
    let provider = create_provider(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;
    let prompts = PromptSet::load(config.prompt_dir.as_deref());
    let agent = InsightsAgent::new(&config, prompts.insights);

    let (insights, _) = runtime()?
        .block_on(agent.analyze(provider.as_ref(), &text, false))
        .map_err(|e| CommandError::ExecutionFailed(format!("Analysis failed: {e}")))?;
    Ok(format_insights(&insights, format))
}

fn cmd_calc(expression: &str, format: OutputFormat) -> Result<String> {
    let value = evaluate(expression)
        .map_err(|e| CommandError::InvalidArgument(format!("{expression}: {e}")))?;
    let result = format_number(value);
    match format {
        OutputFormat::Text => Ok(format!("{result}\n")),
        OutputFormat::Json => Ok(format.to_json(&json!({
            "expression": expression,
            "result": value,
        }))),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown");
                output.push_str("  ");
                output.push_str(name);
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => Ok(format.to_json(&json!({
            "directory": target_dir,
            "written": written,
        }))),
    }
}
