use std::sync::Arc;

use crate::types::{Document, FieldWeights, KeywordHit};

/// Text → fixed-size vector. Must be deterministic for a given model.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    /// One row per input text, each of length `dim()`.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Builds a keyword index once per corpus load.
pub trait KeywordIndexer: Send + Sync {
    type Index: KeywordIndex;

    fn build(&self, documents: &[Arc<Document>], weights: &FieldWeights) -> anyhow::Result<Self::Index>;
}

/// A read-only weighted multi-field index.
pub trait KeywordIndex: Send + Sync {
    /// Candidates ranked best first.
    fn search(&self, query: &str) -> anyhow::Result<Vec<KeywordHit>>;
}

pub trait DocumentStore: Send + Sync {
    fn get_all(&self) -> anyhow::Result<Vec<Document>>;
}
