//! Raw query → normalized token string.
//!
//! Trims and lowercases, replaces known misspellings with their canonical
//! term, then drops stop-words. Both steps are exact per-token lookups.

use std::collections::{HashMap, HashSet};

const COMMON_MISSPELLINGS: &[(&str, &[&str])] = &[
    ("react", &["raect", "recat", "reactt"]),
    ("javascript", &["javascrip", "javscript", "javasript"]),
    ("typescript", &["typescrip", "typscript", "typescipt"]),
    ("angular", &["angualr", "anglar", "angulr"]),
    ("vue", &["veu", "vu", "vuee"]),
    ("css", &["cs", "ccs"]),
    ("html", &["htm", "htlm"]),
    ("webpack", &["webpac", "webpak", "webpackk"]),
    ("vite", &["vit", "vitee"]),
    ("nodejs", &["node", "nodjs"]),
];

const STOP_WORDS: &[&str] = &[
    // English function words
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it", "its", "of", "on",
    "or", "that", "the", "to", "was", "were", "will", "with", "this", "these", "those", "how", "what", "which",
    "who", "why", "when", "where", "do", "does", "did", "can", "could", "should", "would", "i", "me", "my",
    // Chinese function words
    "的", "是", "在", "有", "和", "与", "或", "但", "如何", "什么", "怎么",
];

#[derive(Debug, Clone)]
pub struct QueryOptimizer {
    corrections: HashMap<String, String>,
    stop_words: HashSet<String>,
    spell_check: bool,
}

impl Default for QueryOptimizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl QueryOptimizer {
    pub fn new(spell_check: bool) -> Self {
        let corrections = COMMON_MISSPELLINGS
            .iter()
            .flat_map(|(canonical, variants)| variants.iter().map(move |v| ((*v).to_string(), (*canonical).to_string())))
            .collect();
        let stop_words = STOP_WORDS.iter().map(|w| (*w).to_string()).collect();
        Self { corrections, stop_words, spell_check }
    }

    /// Empty output means there is nothing left to search for.
    pub fn optimize(&self, raw: &str) -> String {
        let lowered = raw.trim().to_lowercase();
        lowered
            .split_whitespace()
            .map(|token| self.correct(token))
            .filter(|token| !self.stop_words.contains(*token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn correct<'a>(&'a self, token: &'a str) -> &'a str {
        if !self.spell_check {
            return token;
        }
        self.corrections.get(token).map_or(token, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_lowercases_and_collapses_spaces() {
        assert_eq!(QueryOptimizer::default().optimize("  useState   Hook "), "usestate hook");
    }

    #[test]
    fn corrects_exact_misspellings_only() {
        let opt = QueryOptimizer::default();
        assert_eq!(opt.optimize("Raect hooks"), "react hooks");
        assert_eq!(opt.optimize("reacts"), "reacts");
        assert_eq!(QueryOptimizer::new(false).optimize("raect"), "raect");
    }

    #[test]
    fn removes_mixed_language_stop_words() {
        let opt = QueryOptimizer::default();
        assert_eq!(opt.optimize("how to use the webpak"), "use webpack");
        assert_eq!(opt.optimize("如何 使用 react"), "使用 react");
    }

    #[test]
    fn all_stop_words_yield_empty() {
        assert_eq!(QueryOptimizer::default().optimize("the of 的"), "");
        assert_eq!(QueryOptimizer::default().optimize("   "), "");
    }
}
