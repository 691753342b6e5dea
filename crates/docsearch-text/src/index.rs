use anyhow::Result;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, ConstScoreQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, TantivyDocument, Term};
use tracing::debug;

use docsearch_core::traits::{KeywordIndex, KeywordIndexer};
use docsearch_core::types::{DocId, Document, FieldMatch, FieldWeights, KeywordHit};

use crate::tantivy_utils::{build_schema, cjk_grams, register_tokenizer, runs, KeywordFields};

const WRITER_MEMORY_BYTES: usize = 50_000_000;
const FUZZY_DISTANCE: u8 = 1;

/// Builds an in-RAM tantivy index over title, content, tags and summary.
#[derive(Debug, Clone)]
pub struct TantivyIndexer {
    min_match_char_length: usize,
}

impl TantivyIndexer {
    /// Query tokens shorter than `min_match_char_length` characters are ignored.
    pub fn new(min_match_char_length: usize) -> Self {
        Self { min_match_char_length: min_match_char_length.max(1) }
    }
}

impl Default for TantivyIndexer {
    fn default() -> Self { Self::new(2) }
}

impl KeywordIndexer for TantivyIndexer {
    type Index = TantivyKeywordIndex;

    fn build(&self, documents: &[Arc<Document>], weights: &FieldWeights) -> Result<TantivyKeywordIndex> {
        let schema = build_schema();
        let index = Index::create_in_ram(schema.clone());
        register_tokenizer(&index);
        let fields = KeywordFields::resolve(&schema)?;

        let mut index_writer = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES)?;
        for d in documents {
            let mut tdoc: TantivyDocument = doc!(
                fields.id => d.id.clone(),
                fields.title => d.title.clone(),
                fields.content => d.content.clone(),
                fields.summary => d.summary.clone(),
            );
            for tag in &d.tags {
                tdoc.add_text(fields.tags, tag);
            }
            index_writer.add_document(tdoc)?;
        }
        index_writer.commit()?;
        let reader = index.reader()?;
        reader.reload()?;
        debug!(documents = documents.len(), "built keyword index");

        let by_id = documents.iter().map(|d| (d.id.clone(), Arc::clone(d))).collect();
        Ok(TantivyKeywordIndex {
            index,
            reader,
            fields,
            weights: *weights,
            min_match_char_length: self.min_match_char_length,
            by_id,
        })
    }
}

/// Multi-field index. Latin terms match with one edit; CJK bigrams match
/// exactly. Each matched (term, field) pair scores the weight of its field.
pub struct TantivyKeywordIndex {
    index: Index,
    reader: IndexReader,
    fields: KeywordFields,
    weights: FieldWeights,
    min_match_char_length: usize,
    by_id: HashMap<DocId, Arc<Document>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueryTerm {
    text: String,
    exact: bool,
}

impl TantivyKeywordIndex {
    pub fn len(&self) -> usize { self.by_id.len() }

    pub fn is_empty(&self) -> bool { self.by_id.is_empty() }

    /// Lowercased alphanumeric runs, deduplicated in order. CJK runs are
    /// broken into bigrams. Everything else is dropped.
    fn query_terms(&self, query: &str) -> Vec<QueryTerm> {
        let lowered = query.to_lowercase();
        let mut terms: Vec<QueryTerm> = Vec::new();
        for run in runs(&lowered) {
            let text = &lowered[run.range];
            if text.chars().count() < self.min_match_char_length {
                continue;
            }
            let units: Vec<&str> = if run.cjk {
                cjk_grams(text, false).into_iter().map(|g| &text[g]).collect()
            } else {
                vec![text]
            };
            for unit in units {
                if !terms.iter().any(|t| t.text == unit) {
                    terms.push(QueryTerm { text: unit.to_string(), exact: run.cjk });
                }
            }
        }
        terms
    }

    fn build_query(&self, terms: &[QueryTerm]) -> BooleanQuery {
        let weighted = [
            (self.fields.title, self.weights.title),
            (self.fields.content, self.weights.content),
            (self.fields.tags, self.weights.tags),
            (self.fields.summary, self.weights.summary),
        ];
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(terms.len() * weighted.len());
        for term in terms {
            for (field, weight) in weighted {
                let indexed = Term::from_field_text(field, &term.text);
                // Both arms score a constant 1, scaled by the field weight.
                let matcher: Box<dyn Query> = if term.exact {
                    Box::new(ConstScoreQuery::new(Box::new(TermQuery::new(indexed, IndexRecordOption::Basic)), 1.0))
                } else {
                    Box::new(FuzzyTermQuery::new(indexed, FUZZY_DISTANCE, true))
                };
                clauses.push((Occur::Should, Box::new(BoostQuery::new(matcher, weight))));
            }
        }
        BooleanQuery::new(clauses)
    }

    fn field_matches(document: &Document, terms: &[String]) -> Vec<FieldMatch> {
        let mut matches = Vec::new();
        let mut push = |field: &str, value: &str| {
            let spans = term_spans(value, terms);
            if !spans.is_empty() {
                matches.push(FieldMatch { field: field.to_string(), value: value.to_string(), spans });
            }
        };
        push("title", &document.title);
        push("content", &document.content);
        for tag in &document.tags {
            push("tags", tag);
        }
        push("summary", &document.summary);
        matches
    }
}

impl KeywordIndex for TantivyKeywordIndex {
    fn search(&self, query: &str) -> Result<Vec<KeywordHit>> {
        let terms = self.query_terms(query);
        if terms.is_empty() || self.by_id.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.build_query(&terms);
        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(self.by_id.len()))?;

        let ceiling = terms.len() as f32 * self.weights.total();
        let texts: Vec<String> = terms.into_iter().map(|t| t.text).collect();
        let mut hits = Vec::new();
        for (score, addr) in top_docs {
            if score <= 0.0 {
                continue;
            }
            let stored: TantivyDocument = searcher.doc(addr)?;
            let Some(id) = stored.get_first(self.fields.id).and_then(|v| v.as_str()) else {
                continue;
            };
            let Some(document) = self.by_id.get(id) else {
                continue;
            };
            let normalized = if ceiling > 0.0 { (score / ceiling).clamp(0.0, 1.0) } else { 0.0 };
            hits.push(KeywordHit {
                id: id.to_string(),
                distance: 1.0 - normalized,
                matches: Self::field_matches(document, &texts),
            });
        }
        Ok(hits)
    }
}

/// Byte ranges of every term occurrence in `value`, ASCII case-insensitive,
/// sorted by start.
fn term_spans(value: &str, terms: &[String]) -> Vec<Range<usize>> {
    let lowered = value.to_ascii_lowercase();
    let mut spans: Vec<Range<usize>> = terms
        .iter()
        .flat_map(|term| lowered.match_indices(term.as_str()).map(|(start, m)| start..start + m.len()))
        .collect();
    spans.sort_by_key(|r| (r.start, r.end));
    spans
}
