//! Page-aware text chunking.
//!
//! Documents arrive as text with a `--- Page N ---` marker before each page's
//! content. The chunker recovers the pages and slides a fixed-size window with
//! overlap across each page independently, so no chunk ever spans two pages.
//!
//! Window sizes are measured in extended grapheme clusters.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::ChunkingError;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive windows of the same page.
pub const DEFAULT_OVERLAP: usize = 200;

/// Literal marker preceding each page's content.
static PAGE_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"--- Page (\d+) ---").ok());

/// Window parameters for the [`Chunker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Window length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive windows.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    /// Distance between the starts of two consecutive windows.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    fn validate(&self) -> Result<(), ChunkingError> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::InvalidConfig {
                reason: "chunk_size must be greater than zero".to_string(),
            });
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkingError::InvalidConfig {
                reason: format!(
                    "overlap ({}) must be smaller than chunk_size ({})",
                    self.overlap, self.chunk_size
                ),
            });
        }
        Ok(())
    }
}

/// A page recovered from page-delimited text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a> {
    /// 1-based page number taken from the marker.
    pub number: u32,
    /// Raw page content between this marker and the next.
    pub content: &'a str,
}

/// A window of page text, before embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageChunk {
    /// Window text, untrimmed.
    pub text: String,
    /// Page the window was cut from.
    pub page: u32,
}

/// Splits page-delimited text into overlapping per-page windows.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Creates a chunker with validated window parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkingError::InvalidConfig`] if `chunk_size` is zero or
    /// `overlap >= chunk_size`.
    pub fn new(config: ChunkerConfig) -> Result<Self, ChunkingError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the window parameters.
    #[must_use]
    pub const fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Recovers pages from marker-delimited text.
    ///
    /// Content before the first marker is ignored. Markers whose page number
    /// is zero or does not fit in a `u32` are skipped along with their content.
    #[must_use]
    pub fn split_pages<'a>(&self, text: &'a str) -> Vec<Page<'a>> {
        let Some(marker) = PAGE_MARKER.as_ref() else {
            return Vec::new();
        };
        let markers: Vec<_> = marker.captures_iter(text).collect();
        let mut pages = Vec::with_capacity(markers.len());

        for (i, caps) in markers.iter().enumerate() {
            let Some(whole) = caps.get(0) else { continue };
            let content_end = markers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let raw_number = caps.get(1).map_or("", |m| m.as_str());

            match raw_number.parse::<u32>() {
                Ok(number) if number > 0 => pages.push(Page {
                    number,
                    content: &text[whole.end()..content_end],
                }),
                _ => warn!(marker = whole.as_str(), "skipping page with invalid number"),
            }
        }

        pages
    }

    /// Cuts the text into per-page windows, in page then offset order.
    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<PageChunk> {
        self.split_pages(text)
            .into_iter()
            .flat_map(|page| self.chunk_page(page))
            .collect()
    }

    /// Windows over a single page. The last window may be shorter than
    /// `chunk_size`; a new window starts whenever the previous start plus the
    /// step is still inside the page.
    fn chunk_page(&self, page: Page<'_>) -> Vec<PageChunk> {
        let boundaries: Vec<usize> = page
            .content
            .grapheme_indices(true)
            .map(|(offset, _)| offset)
            .chain(std::iter::once(page.content.len()))
            .collect();
        let len = boundaries.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < len {
            let end = (start + self.config.chunk_size).min(len);
            chunks.push(PageChunk {
                text: page.content[boundaries[start]..boundaries[end]].to_string(),
                page: page.number,
            });
            start += self.config.step();
        }
        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            config: ChunkerConfig::default(),
        }
    }
}
