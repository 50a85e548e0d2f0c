//! Bibliographic search tool backed by the Semantic Scholar graph API.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AgentError;

/// Default number of papers returned to the model.
pub const DEFAULT_PAPER_LIMIT: usize = 3;
/// Abstracts are cut to this many characters.
const ABSTRACT_PREVIEW_CHARS: usize = 150;
/// Default Semantic Scholar API base URL.
pub const DEFAULT_SCHOLAR_BASE_URL: &str = "https://api.semanticscholar.org";

/// A paper record returned by a bibliographic search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRecord {
    /// Paper title.
    #[serde(default)]
    pub title: String,
    /// Abstract, when available.
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Publication year.
    #[serde(default)]
    pub year: Option<u32>,
    /// Citation count.
    #[serde(default)]
    pub citation_count: Option<u64>,
    /// Landing page URL.
    #[serde(default)]
    pub url: Option<String>,
}

impl PaperRecord {
    /// Formats the record as a short summary block for the model.
    #[must_use]
    pub fn summary(&self) -> String {
        let year = self
            .year
            .map_or_else(|| "n.d.".to_string(), |y| y.to_string());
        let citations = self
            .citation_count
            .map_or_else(|| "unknown".to_string(), |c| c.to_string());
        let abstract_preview: String = self
            .abstract_text
            .as_deref()
            .unwrap_or("No abstract available")
            .chars()
            .take(ABSTRACT_PREVIEW_CHARS)
            .collect();
        format!(
            "Title: {} ({year})\nCitations: {citations}\nAbstract: {abstract_preview}...\nLink: {}",
            self.title,
            self.url.as_deref().unwrap_or("n/a"),
        )
    }
}

/// External bibliographic search capability.
#[async_trait]
pub trait PaperSearch: Send + Sync {
    /// Searches for up to `limit` papers matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolExecution`] on network or decoding failures.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PaperRecord>, AgentError>;
}

/// Formats search results as the tool's result text.
#[must_use]
pub fn format_papers(papers: &[PaperRecord]) -> String {
    if papers.is_empty() {
        return "No papers found.".to_string();
    }
    papers
        .iter()
        .map(PaperRecord::summary)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Client for `GET /graph/v1/paper/search`.
#[derive(Debug, Clone)]
pub struct SemanticScholarClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<PaperRecord>,
}

impl SemanticScholarClient {
    /// Creates a client against the public API.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_SCHOLAR_BASE_URL)
    }

    /// Creates a client against a custom base URL (proxies, mirrors).
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for SemanticScholarClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaperSearch for SemanticScholarClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PaperRecord>, AgentError> {
        let to_error = |e: reqwest::Error| AgentError::ToolExecution {
            name: crate::agent::tool::SEARCH_PAPERS.to_string(),
            message: e.to_string(),
        };

        let limit = limit.to_string();
        let response = self
            .http
            .get(format!("{}/graph/v1/paper/search", self.base_url))
            .query(&[
                ("query", query),
                ("limit", limit.as_str()),
                ("fields", "title,abstract,year,citationCount,url"),
            ])
            .send()
            .await
            .map_err(to_error)?
            .error_for_status()
            .map_err(to_error)?;

        let parsed: SearchResponse = response.json().await.map_err(to_error)?;
        Ok(parsed.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper() -> PaperRecord {
        PaperRecord {
            title: "Attention Is All You Need".to_string(),
            abstract_text: Some("x".repeat(400)),
            year: Some(2017),
            citation_count: Some(100_000),
            url: Some("https://example.org/p".to_string()),
        }
    }

    #[test]
    fn test_summary_format() {
        let summary = paper().summary();
        assert!(summary.starts_with("Title: Attention Is All You Need (2017)\n"));
        assert!(summary.contains("Citations: 100000"));
        assert!(summary.contains(&format!("Abstract: {}...", "x".repeat(150))));
        assert!(!summary.contains(&"x".repeat(151)));
        assert!(summary.ends_with("Link: https://example.org/p"));
    }

    #[test]
    fn test_summary_missing_fields() {
        let summary = PaperRecord {
            title: "Untitled".to_string(),
            ..PaperRecord::default()
        }
        .summary();
        assert!(summary.contains("(n.d.)"));
        assert!(summary.contains("No abstract available"));
    }

    #[test]
    fn test_format_papers() {
        assert_eq!(format_papers(&[]), "No papers found.");
        let two = format_papers(&[paper(), paper()]);
        assert_eq!(two.matches("Title:").count(), 2);
        assert!(two.contains("\n\nTitle:"));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"total": 1, "data": [{"paperId": "abc", "title": "T", "abstract": null, "year": 2020, "citationCount": 5, "url": "u"}]}"#;
        let parsed: SearchResponse =
            serde_json::from_str(json).unwrap_or_else(|_| unreachable!());
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].citation_count, Some(5));
        assert!(parsed.data[0].abstract_text.is_none());
    }

    #[test]
    fn test_response_without_data() {
        let parsed: SearchResponse =
            serde_json::from_str(r#"{"total": 0}"#).unwrap_or_else(|_| unreachable!());
        assert!(parsed.data.is_empty());
    }
}
