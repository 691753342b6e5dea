//! docsearch-vector
//!
//! Row-normalized embedding matrix on candle tensors and the cosine-threshold
//! semantic search built on it.

pub mod matrix;
pub mod semantic;

pub use matrix::EmbeddingMatrix;
pub use semantic::semantic_search;
