use std::cmp::Ordering;
use std::collections::HashMap;

use docsearch_core::types::{DocId, SearchResult, SortBy};

/// Blend factors for hybrid combination. Scores are accumulated, never
/// renormalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    pub semantic: f32,
    pub keyword: f32,
}

impl Default for BlendWeights {
    fn default() -> Self { Self { semantic: 0.7, keyword: 0.3 } }
}

/// Merge semantic and keyword results into one entry per document.
///
/// Semantic results come first with `score * semantic`. A keyword result for
/// a document already present adds `score * keyword` and appends its
/// highlights; otherwise it is inserted with `score * keyword`. Output keeps
/// first-insertion order.
pub fn combine(semantic: Vec<SearchResult>, keyword: Vec<SearchResult>, weights: BlendWeights) -> Vec<SearchResult> {
    let mut merged: Vec<SearchResult> = Vec::with_capacity(semantic.len() + keyword.len());
    let mut slots: HashMap<DocId, usize> = HashMap::new();

    for mut result in semantic {
        result.score *= weights.semantic;
        match slots.get(&result.document.id) {
            Some(&i) => merged[i] = result,
            None => {
                slots.insert(result.document.id.clone(), merged.len());
                merged.push(result);
            }
        }
    }
    for result in keyword {
        match slots.get(&result.document.id) {
            Some(&i) => {
                let existing = &mut merged[i];
                existing.score += result.score * weights.keyword;
                existing.highlights.extend(result.highlights);
            }
            None => {
                slots.insert(result.document.id.clone(), merged.len());
                let mut fresh = result;
                fresh.score *= weights.keyword;
                merged.push(fresh);
            }
        }
    }
    merged
}

/// Stable sort by the requested key.
///
/// Under `Relevance`, a result whose lowercased title contains the
/// lowercased query compares as `score * title_boost`; stored scores are left
/// untouched.
pub fn sort_results(results: Vec<SearchResult>, sort_by: SortBy, query: &str, title_boost: f32) -> Vec<SearchResult> {
    match sort_by {
        SortBy::Relevance => {
            let needle = query.to_lowercase();
            let mut keyed: Vec<(f32, SearchResult)> = results
                .into_iter()
                .map(|r| {
                    let boosted = if r.document.title.to_lowercase().contains(&needle) { r.score * title_boost } else { r.score };
                    (boosted, r)
                })
                .collect();
            keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
            keyed.into_iter().map(|(_, r)| r).collect()
        }
        SortBy::Title => {
            let mut results = results;
            results.sort_by(|a, b| caseless_cmp(&a.document.title, &b.document.title));
            results
        }
        SortBy::Category => {
            let mut results = results;
            results.sort_by(|a, b| caseless_cmp(&a.document.category, &b.document.category));
            results
        }
    }
}

/// Case-insensitive order; strings equal up to case fall back to a
/// byte-wise comparison.
fn caseless_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsearch_core::types::Document;
    use std::sync::Arc;

    fn result(id: &str, title: &str, category: &str, score: f32) -> SearchResult {
        SearchResult::new(
            Arc::new(Document {
                id: id.into(),
                title: title.into(),
                content: String::new(),
                url: String::new(),
                category: category.into(),
                tags: vec![],
                summary: String::new(),
            }),
            score,
        )
    }

    #[test]
    fn blend_law_is_exact() {
        let merged = combine(
            vec![result("b", "B", "x", 0.6).with_highlights(vec!["s".into()])],
            vec![result("b", "B", "x", 0.9).with_highlights(vec!["k".into()]), result("c", "C", "x", 0.5)],
            BlendWeights::default(),
        );
        assert_eq!(merged.len(), 2);
        assert!((merged[0].score - (0.7 * 0.6 + 0.3 * 0.9)).abs() < 1e-6);
        assert_eq!(merged[0].highlights, vec!["s", "k"]);
        assert!((merged[1].score - 0.15).abs() < 1e-6);
    }

    #[test]
    fn combine_never_duplicates() {
        let merged = combine(
            vec![result("a", "A", "x", 0.5), result("a", "A", "x", 0.4)],
            vec![result("a", "A", "x", 0.5), result("a", "A", "x", 0.5)],
            BlendWeights::default(),
        );
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn title_boost_breaks_equal_scores() {
        let sorted = sort_results(
            vec![result("plain", "Other", "x", 0.5), result("boosted", "useState Hook", "x", 0.5)],
            SortBy::Relevance,
            "usestate",
            1.5,
        );
        assert_eq!(sorted[0].document.id, "boosted");
        assert_eq!(sorted[0].score, 0.5, "boost is comparison-only");
    }

    #[test]
    fn relevance_ties_keep_input_order() {
        let sorted = sort_results(
            vec![result("1", "a", "x", 0.3), result("2", "b", "x", 0.3), result("3", "c", "x", 0.9)],
            SortBy::Relevance,
            "zzz",
            1.5,
        );
        let ids: Vec<&str> = sorted.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn title_and_category_sorts_are_lexicographic() {
        let input = vec![result("1", "b", "Vue", 0.9), result("2", "a", "CSS", 0.1), result("3", "c", "React", 0.5)];
        let by_title = sort_results(input.clone(), SortBy::Title, "q", 1.5);
        assert_eq!(by_title.iter().map(|r| r.document.title.as_str()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
        let by_category = sort_results(input, SortBy::Category, "q", 1.5);
        assert_eq!(
            by_category.iter().map(|r| r.document.category.as_str()).collect::<Vec<_>>(),
            vec!["CSS", "React", "Vue"]
        );
    }

    #[test]
    fn title_and_category_sorts_ignore_case() {
        let input = vec![
            result("1", "apple guide", "vue", 0.1),
            result("2", "Zebra layout", "CSS", 0.2),
            result("3", "Grid", "react", 0.3),
        ];
        let by_title = sort_results(input.clone(), SortBy::Title, "q", 1.5);
        assert_eq!(
            by_title.iter().map(|r| r.document.title.as_str()).collect::<Vec<_>>(),
            vec!["apple guide", "Grid", "Zebra layout"]
        );
        let by_category = sort_results(input, SortBy::Category, "q", 1.5);
        assert_eq!(
            by_category.iter().map(|r| r.document.category.as_str()).collect::<Vec<_>>(),
            vec!["CSS", "react", "vue"]
        );
    }
}
