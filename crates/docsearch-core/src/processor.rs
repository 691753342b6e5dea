//! Normalization applied to raw corpus records before they are indexed.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::types::Document;

const SUMMARY_MAX_CHARS: usize = 150;
const SUMMARY_CUT_CHARS: usize = 147;

const TERM_SYNONYMS: &[(&str, &[&str])] = &[
    ("React", &["React.js", "ReactJS"]),
    ("Vue", &["Vue.js", "VueJS"]),
    ("Angular", &["AngularJS", "enterprise framework"]),
    ("JavaScript", &["JS", "ECMAScript"]),
    ("TypeScript", &["TS", "static typing"]),
    ("CSS", &["stylesheet", "cascading style sheets"]),
    ("HTML", &["hypertext markup language", "page structure"]),
    ("Node.js", &["NodeJS", "server-side JavaScript"]),
    ("Webpack", &["module bundler", "build tool"]),
    ("Vite", &["build tool", "dev server"]),
];

const TAG_RELATIONS: &[(&str, &[&str])] = &[
    ("react", &["jsx", "virtual-dom", "component"]),
    ("vue", &["template", "directive", "single-file-component"]),
    ("angular", &["component", "service", "module"]),
    ("javascript", &["es6", "es2015", "browser"]),
    ("typescript", &["types", "interfaces", "compiler"]),
    ("css", &["styles", "layout", "design"]),
    ("html", &["markup", "semantic", "accessibility"]),
    ("hooks", &["functional-component", "state-management"]),
    ("async", &["promise", "callback", "event-loop"]),
    ("performance", &["optimization", "speed", "efficiency"]),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentProcessor;

impl DocumentProcessor {
    pub fn new() -> Self { Self }

    pub fn process_documents(&self, raw: Vec<Document>) -> Vec<Document> {
        raw.into_iter().map(|doc| self.process_document(doc)).collect()
    }

    pub fn process_document(&self, raw: Document) -> Document {
        let summary = Self::summary_for(&raw.content, &raw.summary);
        Document {
            id: raw.id.trim().to_string(),
            title: Self::clean_text(&raw.title),
            content: Self::enhance_content(&raw.content),
            url: raw.url.trim().to_string(),
            category: raw.category.trim().to_string(),
            tags: Self::process_tags(&raw.tags),
            summary,
        }
    }

    /// Collapse whitespace runs into single spaces.
    pub fn clean_text(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn enhance_content(content: &str) -> String {
        let mut enhanced = Self::clean_text(content);
        let appended: Vec<&str> = TERM_SYNONYMS
            .iter()
            .filter(|(term, _)| enhanced.contains(term))
            .flat_map(|(_, synonyms)| synonyms.iter().take(2).copied())
            .collect();
        for synonym in appended {
            enhanced.push(' ');
            enhanced.push_str(synonym);
        }
        enhanced
    }

    fn process_tags(tags: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let lowered = tags.iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty());
        let related = tags.iter().flat_map(|t| {
            let key = t.trim().to_lowercase();
            TAG_RELATIONS
                .iter()
                .find(|(tag, _)| *tag == key)
                .map(|(_, rel)| rel.iter().map(|s| (*s).to_string()).collect::<Vec<_>>())
                .unwrap_or_default()
        });
        for tag in lowered.chain(related) {
            if seen.insert(tag.clone()) {
                out.push(tag);
            }
        }
        out
    }

    fn summary_for(content: &str, existing: &str) -> String {
        let existing = existing.trim();
        if !existing.is_empty() {
            return existing.to_string();
        }
        let sentences: Vec<&str> = content
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(2)
            .collect();
        let summary = Self::clean_text(&sentences.join(". "));
        if summary.chars().count() > SUMMARY_MAX_CHARS {
            let cut: String = summary.chars().take(SUMMARY_CUT_CHARS).collect();
            format!("{cut}...")
        } else if summary.is_empty() {
            summary
        } else {
            format!("{summary}.")
        }
    }

    /// Required fields must be non-blank.
    pub fn validate(doc: &Document) -> Result<()> {
        let required = [
            ("id", &doc.id),
            ("title", &doc.title),
            ("category", &doc.category),
            ("content", &doc.content),
            ("url", &doc.url),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(Error::InvalidDocument(format!("document '{}' has empty {}", doc.id, field))),
            None => Ok(()),
        }
    }

    pub fn category_counts<'a, I>(docs: I) -> BTreeMap<String, usize>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut counts = BTreeMap::new();
        for doc in docs {
            *counts.entry(doc.category.clone()).or_insert(0) += 1;
        }
        counts
    }
}
