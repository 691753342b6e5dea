//! Domain types shared by the text, vector and hybrid engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::Arc;

pub type DocId = String;

/// A document of the search corpus.
///
/// - `id`: stable, unique within a corpus
/// - `category`: single facet used by the category filter
/// - `tags`: ordered free-form labels used by the tag filter
/// - `summary`: short abstract; filled in by the processor when absent
///
/// Documents are immutable once loaded into an engine; results share them
/// through `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub url: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

impl Document {
    /// Text handed to the embedder: title, content and tags.
    pub fn embedding_text(&self) -> String {
        format!("{} {} {}", self.title, self.content, self.tags.join(" "))
    }
}

/// One ranked hit of a search call.
///
/// `score` is only comparable within the call that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub document: Arc<Document>,
    pub score: f32,
    pub highlights: Vec<String>,
}

impl SearchResult {
    pub fn new(document: Arc<Document>, score: f32) -> Self {
        Self { document, score, highlights: Vec::new() }
    }

    pub fn with_highlights(mut self, highlights: Vec<String>) -> Self {
        self.highlights = highlights;
        self
    }
}

/// Search strategies; exactly one runs per call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Semantic,
    Keyword,
    Fuzzy,
    Exact,
    #[default]
    Hybrid,
}

impl std::str::FromStr for SearchMode {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "semantic" => Ok(Self::Semantic),
            "keyword" => Ok(Self::Keyword),
            "fuzzy" => Ok(Self::Fuzzy),
            "exact" => Ok(Self::Exact),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(crate::error::Error::InvalidConfig(format!("unknown search mode '{other}'"))),
        }
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Relevance,
    Title,
    Category,
}

impl std::str::FromStr for SortBy {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relevance" => Ok(Self::Relevance),
            "title" => Ok(Self::Title),
            "category" => Ok(Self::Category),
            other => Err(crate::error::Error::InvalidConfig(format!("unknown sort key '{other}'"))),
        }
    }
}

/// Filters for one search call.
///
/// Sets keep the serialized form independent of insertion order, which the
/// result cache relies on for its keys. `min_score` is applied to scored
/// results, never to documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
    /// Final slice applied after sorting. `Some(0)` counts as unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

impl SearchFilters {
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Category and tag predicates; unset or empty sets admit everything.
    pub fn admits(&self, document: &Document) -> bool {
        if let Some(categories) = self.categories.as_ref().filter(|c| !c.is_empty()) {
            if !categories.contains(&document.category) {
                return false;
            }
        }
        if let Some(tags) = self.tags.as_ref().filter(|t| !t.is_empty()) {
            if !document.tags.iter().any(|t| tags.contains(t)) {
                return false;
            }
        }
        true
    }
}

/// Per-call switches of the search facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub filters: SearchFilters,
    pub mode: SearchMode,
    pub sort_by: SortBy,
    pub enable_highlight: bool,
    pub include_metadata: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            filters: SearchFilters::default(),
            mode: SearchMode::Hybrid,
            sort_by: SortBy::Relevance,
            enable_highlight: true,
            include_metadata: true,
        }
    }
}

impl SearchOptions {
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sort(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Describes one completed search call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMetadata {
    pub search_time_ms: f64,
    pub total_results: usize,
    pub semantic_result_count: usize,
    pub keyword_result_count: usize,
    /// Query after optimization.
    pub query: String,
    pub mode: SearchMode,
    pub filters: SearchFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub metadata: Option<SearchMetadata>,
}

/// One entry of the search analytics log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub query: String,
    pub result_count: usize,
    pub search_time_ms: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularQuery {
    pub query: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub document_count: usize,
    pub embedding_dim: usize,
    pub categories: BTreeMap<String, usize>,
    pub cache_entries: usize,
    pub analytics_records: usize,
}

/// Relative weight of each document field in keyword scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub title: f32,
    pub content: f32,
    pub tags: f32,
    pub summary: f32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self { title: 0.4, content: 0.3, tags: 0.2, summary: 0.1 }
    }
}

impl FieldWeights {
    pub fn total(&self) -> f32 {
        self.title + self.content + self.tags + self.summary
    }
}

/// Where a keyword hit matched: the field, its text, and byte ranges of the
/// matched query tokens inside `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMatch {
    pub field: String,
    pub value: String,
    pub spans: Vec<Range<usize>>,
}

/// Raw candidate from a keyword index. `distance` is in `[0, 1]`, lower is
/// better.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordHit {
    pub id: DocId,
    pub distance: f32,
    pub matches: Vec<FieldMatch>,
}
