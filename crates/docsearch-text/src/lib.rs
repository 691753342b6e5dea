//! docsearch-text
//!
//! Query normalization, edit-distance matching, sentence highlights and the
//! tantivy-backed weighted keyword index.

pub mod fuzzy;
pub mod highlight;
pub mod index;
pub mod optimizer;
pub mod tantivy_utils;

pub use fuzzy::{fuzzy_score_against_text, levenshtein, similarity};
pub use highlight::extract_highlights;
pub use index::{TantivyIndexer, TantivyKeywordIndex};
pub use optimizer::QueryOptimizer;
