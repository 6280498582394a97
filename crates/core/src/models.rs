use crate::error::{IngestError, SearchError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_URL_BASE: &str = "https://www.opensubtitles.org/en/subtitles";

/// One row of the subtitle corpus. The blob stays compressed until extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: i64,
    pub name: String,
    pub raw_content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub document_id: i64,
    pub text: String,
    pub start_word_offset: usize,
}

/// A subtitle entry whose spoken text matched a keyword query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLine {
    pub timestamp_range: String,
    pub text: String,
}

/// Which vector representation backs an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    Keyword,
    Semantic,
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexMode::Keyword => f.write_str("keyword"),
            IndexMode::Semantic => f.write_str("semantic"),
        }
    }
}

/// Retrieval strategy requested by a caller.
///
/// `Exact` scans decoded subtitles for literal substrings; the other two rank
/// chunks of a prebuilt [`IndexMode`] index by cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Exact,
    Keyword,
    Semantic,
}

impl SearchMode {
    pub fn index_mode(self) -> Option<IndexMode> {
        match self {
            SearchMode::Exact => None,
            SearchMode::Keyword => Some(IndexMode::Keyword),
            SearchMode::Semantic => Some(IndexMode::Semantic),
        }
    }
}

impl FromStr for SearchMode {
    type Err = SearchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(SearchMode::Exact),
            "keyword" | "tfidf" => Ok(SearchMode::Keyword),
            "semantic" => Ok(SearchMode::Semantic),
            other => Err(SearchError::UnsupportedMode(other.to_string())),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Exact => f.write_str("exact"),
            SearchMode::Keyword => f.write_str("keyword"),
            SearchMode::Semantic => f.write_str("semantic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub mode: SearchMode,
    pub top_k: usize,
    pub max_results: usize,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    Similarity(f64),
    MatchCount(usize),
}

/// The source record attached to ranked results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRecord {
    pub document_id: i64,
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub document_id: i64,
    pub name: String,
    pub url: String,
    pub relevance: Relevance,
    pub snippet: Option<String>,
    pub matches: Vec<MatchLine>,
    pub record: Option<SourceRecord>,
}

impl SearchResult {
    pub fn score(&self) -> Option<f64> {
        match self.relevance {
            Relevance::Similarity(score) => Some(score),
            Relevance::MatchCount(_) => None,
        }
    }

    pub fn match_count(&self) -> Option<usize> {
        match self.relevance {
            Relevance::MatchCount(count) => Some(count),
            Relevance::Similarity(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub text_available: bool,
    pub line_count: usize,
    pub word_count: usize,
    pub preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchOptions {
    pub chunk_size: usize,
    pub overlap: usize,
    pub sample_ratio: f64,
    pub sample_seed: u64,
    pub top_k: usize,
    pub max_results: usize,
    pub case_sensitive: bool,
    pub snippet_context_chars: usize,
    pub url_base: String,
    pub max_entry_bytes: u64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 100,
            sample_ratio: 1.0,
            sample_seed: 42,
            top_k: 5,
            max_results: 50,
            case_sensitive: false,
            snippet_context_chars: 100,
            url_base: DEFAULT_URL_BASE.to_string(),
            max_entry_bytes: 50 * 1024 * 1024,
        }
    }
}

impl SearchOptions {
    pub fn from_toml(source: &str) -> Result<Self, SearchError> {
        let options: SearchOptions =
            toml::from_str(source).map_err(|error| SearchError::Config(error.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.overlap == 0 || self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap must satisfy 0 < overlap < chunk_size (overlap={}, chunk_size={})",
                self.overlap, self.chunk_size
            )));
        }

        if !(self.sample_ratio > 0.0 && self.sample_ratio <= 1.0) {
            return Err(IngestError::InvalidArgument(format!(
                "sample_ratio must be in (0, 1], got {}",
                self.sample_ratio
            )));
        }

        Ok(())
    }

    pub fn document_url(&self, document_id: i64) -> String {
        format!("{}/{}", self.url_base.trim_end_matches('/'), document_id)
    }
}
