use anyhow::{ensure, Result};
use std::sync::Arc;
use tracing::{debug, instrument};

use docsearch_core::types::{Document, SearchResult};

use crate::matrix::EmbeddingMatrix;

/// Rank `documents` by cosine similarity to `query_embedding`.
///
/// `matrix` row `i` must be the embedding of `documents[i]`. Results with a
/// score at or above `threshold` are returned best first; equal scores keep
/// document order.
#[instrument(level = "debug", skip_all, fields(candidates = documents.len(), threshold = threshold))]
pub fn semantic_search(
    query_embedding: &[f32],
    documents: &[Arc<Document>],
    matrix: &EmbeddingMatrix,
    threshold: f32,
) -> Result<Vec<SearchResult>> {
    ensure!(
        matrix.rows() == documents.len(),
        "embedding matrix has {} rows for {} documents",
        matrix.rows(),
        documents.len()
    );
    let scores = matrix.similarities(query_embedding)?;
    let mut results: Vec<SearchResult> = documents
        .iter()
        .zip(scores)
        .filter(|(_, score)| *score >= threshold)
        .map(|(doc, score)| SearchResult::new(Arc::clone(doc), score))
        .collect();
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    debug!(hits = results.len(), "semantic search");
    Ok(results)
}
