use docsearch_core::types::Document;

const SENTENCE_TERMINALS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

/// Sentences of `document.content` that contain any query token
/// (case-insensitive), in document order, at most `max` of them.
pub fn extract_highlights(document: &Document, query: &str, max: usize) -> Vec<String> {
    let query = query.to_lowercase();
    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }
    document
        .content
        .split(SENTENCE_TERMINALS)
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .filter(|sentence| {
            let lowered = sentence.to_lowercase();
            tokens.iter().any(|t| lowered.contains(*t))
        })
        .take(max)
        .map(str::to_string)
        .collect()
}
