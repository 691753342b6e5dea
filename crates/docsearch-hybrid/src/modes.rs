//! Per-mode candidate generation over an already filtered document subset.
//! Semantic retrieval lives in `docsearch_vector`; the engine wires both.

use std::collections::HashMap;
use std::sync::Arc;

use docsearch_core::types::{DocId, Document, KeywordHit, SearchResult};
use docsearch_text::{extract_highlights, fuzzy_score_against_text};

const FUZZY_TOKEN_THRESHOLD: f64 = 0.7;
const FUZZY_KEEP_THRESHOLD: f64 = 0.3;
const EXACT_TITLE_SCORE: f32 = 1.0;
const EXACT_BODY_SCORE: f32 = 0.8;

fn sort_descending(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Token-averaged substring/edit-distance match over title, content and tags.
pub fn fuzzy_search(query: &str, documents: &[Arc<Document>], max_highlights: usize) -> Vec<SearchResult> {
    let lowered = query.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut results: Vec<SearchResult> = documents
        .iter()
        .filter_map(|doc| {
            let text = format!("{} {} {}", doc.title, doc.content, doc.tags.join(" ")).to_lowercase();
            let total: f64 = tokens.iter().map(|token| token_score(token, &text)).sum();
            let score = total / tokens.len() as f64;
            (score > FUZZY_KEEP_THRESHOLD).then(|| {
                SearchResult::new(Arc::clone(doc), score as f32).with_highlights(extract_highlights(doc, query, max_highlights))
            })
        })
        .collect();
    sort_descending(&mut results);
    results
}

fn token_score(token: &str, text: &str) -> f64 {
    if text.contains(token) {
        return 1.0;
    }
    let fuzzy = fuzzy_score_against_text(token, text);
    if fuzzy > FUZZY_TOKEN_THRESHOLD { fuzzy } else { 0.0 }
}

/// Whole-query substring match on title and content.
pub fn exact_search(query: &str, documents: &[Arc<Document>], max_highlights: usize) -> Vec<SearchResult> {
    let needle = query.to_lowercase();
    let mut results: Vec<SearchResult> = documents
        .iter()
        .filter(|doc| format!("{} {}", doc.title, doc.content).to_lowercase().contains(&needle))
        .map(|doc| {
            let score = if doc.title.to_lowercase().contains(&needle) { EXACT_TITLE_SCORE } else { EXACT_BODY_SCORE };
            SearchResult::new(Arc::clone(doc), score).with_highlights(extract_highlights(doc, query, max_highlights))
        })
        .collect();
    sort_descending(&mut results);
    results
}

/// Turn index hits into results, dropping documents outside `admitted`
/// (indexed by corpus position). Highlights are the matched field values.
pub fn keyword_results(
    hits: Vec<KeywordHit>,
    documents: &[Arc<Document>],
    positions: &HashMap<DocId, usize>,
    admitted: &[bool],
    max_highlights: usize,
) -> Vec<SearchResult> {
    hits.into_iter()
        .filter_map(|hit| {
            let pos = *positions.get(&hit.id)?;
            if !admitted.get(pos).copied().unwrap_or(false) {
                return None;
            }
            let highlights = hit.matches.into_iter().map(|m| m.value).take(max_highlights).collect();
            Some(SearchResult::new(Arc::clone(&documents[pos]), 1.0 - hit.distance).with_highlights(highlights))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsearch_core::types::FieldMatch;

    fn doc(id: &str, title: &str, content: &str) -> Arc<Document> {
        Arc::new(Document {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            url: String::new(),
            category: "Docs".into(),
            tags: vec!["guide".into()],
            summary: String::new(),
        })
    }

    #[test]
    fn fuzzy_token_similarity_boundary_is_strict() {
        // "abcdefghij" vs "abcdefgxyz": distance 3 over 10 chars -> exactly 0.7
        assert_eq!(token_score("abcdefghij", "zzz abcdefgxyz"), 0.0);
        // 100 chars with 29 edits -> 0.71
        let word = "a".repeat(100);
        let near = format!("{}{}", "a".repeat(71), "b".repeat(29));
        assert!((token_score(&word, &near) - 0.71).abs() < 1e-9);
    }

    #[test]
    fn fuzzy_averages_over_tokens() {
        let docs = vec![doc("a", "Hooks intro", "state basics"), doc("b", "Other", "unrelated")];
        let results = fuzzy_search("hooks stat", &docs, 3);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "a");
        assert!((results[0].score - 1.0).abs() < 1e-6, "substring hits count fully");
        let half = fuzzy_search("hooks zzzzzz", &docs, 3);
        assert!((half[0].score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn exact_prefers_title_matches() {
        let docs = vec![
            doc("body", "Guide", "Learn about use state here."),
            doc("title", "Use State", "Nothing else."),
            doc("none", "Other", "Nope."),
        ];
        let results = exact_search("use state", &docs, 3);
        let got: Vec<(&str, f32)> = results.iter().map(|r| (r.document.id.as_str(), r.score)).collect();
        assert_eq!(got, vec![("title", 1.0), ("body", 0.8)]);
        assert_eq!(results[1].highlights, vec!["Learn about use state here"]);
    }

    #[test]
    fn keyword_results_respect_admitted_subset() {
        let docs = vec![doc("a", "A", ""), doc("b", "B", "")];
        let positions: HashMap<DocId, usize> = [("a".to_string(), 0), ("b".to_string(), 1)].into_iter().collect();
        let hit = |id: &str| KeywordHit {
            id: id.into(),
            distance: 0.25,
            matches: vec![FieldMatch { field: "title".into(), value: id.to_uppercase(), spans: vec![0..1] }],
        };
        let results = keyword_results(vec![hit("b"), hit("a"), hit("ghost")], &docs, &positions, &[false, true], 3);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "b");
        assert_eq!(results[0].score, 0.75);
        assert_eq!(results[0].highlights, vec!["B"]);
    }
}
