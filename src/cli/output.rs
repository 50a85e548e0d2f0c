//! Output rendering for CLI commands.
//!
//! Every command returns a `String`; this module turns results into either
//! human-readable text or JSON.

#![allow(clippy::format_push_string)]

use std::fmt::Write;

use serde::Serialize;
use serde_json::json;

use crate::agent::{AgentAnswer, PaperInsights};
use crate::chunking::{Page, PageChunk};
use crate::store::{IndexStats, ScoredChunk};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; anything other than `json` is text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    /// Serializes a value as pretty JSON, falling back to an error object.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
    }
}

/// Shortens `s` to at most `max_len` characters, ending in `...` when cut.
#[must_use]
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return s.chars().take(max_len).collect();
    }
    let head: String = s.chars().take(max_len - 3).collect();
    format!("{head}...")
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Formats recovered pages.
#[must_use]
pub fn format_pages(pages: &[Page<'_>], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if pages.is_empty() {
                return "No pages found (expected '--- Page N ---' markers).\n".to_string();
            }
            let mut out = format!("{} page(s)\n", pages.len());
            for page in pages {
                let _ = writeln!(
                    out,
                    "  Page {:>4}: {} chars",
                    page.number,
                    page.content.trim().chars().count()
                );
            }
            out
        }
        OutputFormat::Json => {
            let list: Vec<_> = pages
                .iter()
                .map(|p| json!({"page": p.number, "chars": p.content.trim().chars().count()}))
                .collect();
            format.to_json(&list)
        }
    }
}

/// Formats chunker windows.
#[must_use]
pub fn format_chunks(
    chunks: &[PageChunk],
    preview: bool,
    preview_len: usize,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = format!("{} chunk(s)\n", chunks.len());
            for (i, chunk) in chunks.iter().enumerate() {
                let _ = write!(
                    out,
                    "  #{i:<4} page {:>4}  {:>5} chars",
                    chunk.page,
                    chunk.text.chars().count()
                );
                if preview {
                    let _ = write!(out, "  {}", truncate_str(&one_line(&chunk.text), preview_len));
                }
                out.push('\n');
            }
            out
        }
        OutputFormat::Json => format.to_json(chunks),
    }
}

/// Formats indexing counters.
#[must_use]
pub fn format_index_stats(stats: &IndexStats, embedder: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "Indexed {} chunk(s) from {} page(s) with '{embedder}' embeddings\n\
             Windows: {} produced, {} too short, {} failed\n",
            stats.indexed, stats.pages, stats.produced, stats.filtered, stats.failed
        ),
        OutputFormat::Json => format.to_json(&json!({
            "embedder": embedder,
            "stats": stats,
        })),
    }
}

/// Formats ranked chunks.
#[must_use]
pub fn format_search_results(results: &[ScoredChunk], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if results.is_empty() {
                return "No results.\n".to_string();
            }
            let mut out = String::new();
            for (rank, r) in results.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "{}. [Page {}] score {:.4}  {}",
                    rank + 1,
                    r.chunk.page_number,
                    r.score,
                    truncate_str(&one_line(&r.chunk.text), 100)
                );
            }
            out
        }
        OutputFormat::Json => format.to_json(results),
    }
}

/// Formats an agent answer with its step log, citations, and sources.
#[must_use]
pub fn format_answer(answer: &AgentAnswer, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for step in &answer.steps {
                out.push_str(&format!("> {step}\n"));
            }
            if !answer.steps.is_empty() {
                out.push('\n');
            }
            out.push_str(&answer.text);
            out.push('\n');

            if !answer.grounding.is_empty() {
                out.push_str("\nSources:\n");
                for source in &answer.grounding {
                    out.push_str(&format!("  - {} <{}>\n", source.title, source.uri));
                }
            }

            let pages: Vec<String> = answer.cited_pages.iter().map(ToString::to_string).collect();
            out.push_str(&format!(
                "\n---\nPages cited: {} | Tool rounds: {} | Tokens: {}\n",
                if pages.is_empty() {
                    "none".to_string()
                } else {
                    pages.join(", ")
                },
                answer.tool_rounds,
                answer.usage.total_tokens
            ));
            out
        }
        OutputFormat::Json => format.to_json(answer),
    }
}

/// Formats document insights.
#[must_use]
pub fn format_insights(insights: &PaperInsights, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = format!("# {}\n\n{}\n", insights.title, insights.summary);
            if !insights.outline.is_empty() {
                out.push_str("\n## Outline\n");
                for (i, item) in insights.outline.iter().enumerate() {
                    let _ = writeln!(out, "{}. {item}", i + 1);
                }
            }
            if !insights.key_points.is_empty() {
                out.push_str("\n## Key Points\n");
                for point in &insights.key_points {
                    let _ = writeln!(out, "- {point}");
                }
            }
            if !insights.concepts.is_empty() {
                out.push_str("\n## Concepts\n");
                for c in &insights.concepts {
                    let _ = write!(out, "- **{}**: {}", c.concept, c.description);
                    if !c.related_to.is_empty() {
                        let _ = write!(out, " (related: {})", c.related_to.join(", "));
                    }
                    out.push('\n');
                }
            }
            out
        }
        OutputFormat::Json => format.to_json(insights),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Chunk, GroundingSource};

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Text);
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello", 5), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hello", 3), "hel");
        assert_eq!(truncate_str("héllo wörld", 6), "hél...");
    }

    #[test]
    fn test_format_answer_text() {
        let answer = AgentAnswer {
            text: "Blue [[Page 1]].".to_string(),
            grounding: vec![GroundingSource {
                uri: "https://example.org".to_string(),
                title: "Example".to_string(),
            }],
            steps: vec!["Retrieving relevant pages...".to_string()],
            cited_pages: vec![1],
            ..AgentAnswer::default()
        };
        let out = format_answer(&answer, OutputFormat::Text);
        assert!(out.starts_with("> Retrieving relevant pages...\n\nBlue [[Page 1]].\n"));
        assert!(out.contains("  - Example <https://example.org>"));
        assert!(out.contains("Pages cited: 1 | Tool rounds: 0"));
    }

    #[test]
    fn test_format_search_json() {
        let results = vec![ScoredChunk {
            chunk: Chunk {
                id: "1-0".to_string(),
                text: "The sky is blue.".to_string(),
                page_number: 1,
                vector: vec![1.0],
            },
            score: 0.9,
        }];
        let out = format_search_results(&results, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(value[0]["chunk"]["page_number"], 1);
        assert!(value[0]["chunk"].get("vector").is_none());
    }

    #[test]
    fn test_format_insights_text() {
        let insights = PaperInsights {
            title: "T".to_string(),
            summary: "S".to_string(),
            key_points: vec!["K".to_string()],
            ..PaperInsights::default()
        };
        let out = format_insights(&insights, OutputFormat::Text);
        assert!(out.starts_with("# T\n\nS\n"));
        assert!(out.contains("## Key Points\n- K\n"));
        assert!(!out.contains("## Outline"));
    }
}
