use std::sync::Arc;

use docsearch_core::types::{Document, SearchFilters, SearchResult};

/// Documents admitted by the category and tag predicates, in corpus order.
pub fn apply_filters(documents: &[Arc<Document>], filters: &SearchFilters) -> Vec<Arc<Document>> {
    documents.iter().filter(|d| filters.admits(d)).cloned().collect()
}

/// Corpus positions of the admitted documents, ascending.
pub fn filtered_positions(documents: &[Arc<Document>], filters: &SearchFilters) -> Vec<usize> {
    documents.iter().enumerate().filter(|(_, d)| filters.admits(d)).map(|(i, _)| i).collect()
}

/// `min_score` applies to scored results only.
pub fn apply_min_score(results: Vec<SearchResult>, min_score: Option<f32>) -> Vec<SearchResult> {
    match min_score {
        Some(min) => results.into_iter().filter(|r| r.score >= min).collect(),
        None => results,
    }
}
