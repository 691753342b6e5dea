//! docsearch-hybrid
//!
//! Combines semantic (embedding) and keyword (tantivy) retrieval behind one
//! engine with filters, alternative matching modes, ranking, a TTL result
//! cache and a bounded analytics log.

pub mod analytics;
pub mod cache;
pub mod engine;
pub mod filter;
pub mod modes;
pub mod rank;

pub use engine::HybridSearchEngine;
pub use rank::{combine, sort_results, BlendWeights};
