use std::ops::Range;

use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, TextAnalyzer, Token, TokenStream, Tokenizer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "docsearch_mixed";

/// Resolved handles of the keyword schema.
#[derive(Debug, Clone, Copy)]
pub struct KeywordFields {
    pub id: Field,
    pub title: Field,
    pub content: Field,
    pub tags: Field,
    pub summary: Field,
}

impl KeywordFields {
    pub fn resolve(schema: &Schema) -> tantivy::Result<Self> {
        Ok(Self {
            id: schema.get_field("id")?,
            title: schema.get_field("title")?,
            content: schema.get_field("content")?,
            tags: schema.get_field("tags")?,
            summary: schema.get_field("summary")?,
        })
    }
}

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    let _id_field = schema_builder.add_text_field("id", STRING | STORED);
    let indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(indexing).set_stored();
    let _title_field = schema_builder.add_text_field("title", text_options.clone());
    let _content_field = schema_builder.add_text_field("content", text_options.clone());
    let _tags_field = schema_builder.add_text_field("tags", text_options.clone());
    let _summary_field = schema_builder.add_text_field("summary", text_options);
    schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
    let tokenizer = TextAnalyzer::builder(MixedScriptTokenizer)
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .build();
    index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}

/// Han, kana and hangul: scripts written without spaces between words.
pub fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7AF
        | 0xF900..=0xFAFF
        | 0x20000..=0x2A6DF)
}

/// An alphanumeric run of `text`. CJK characters never share a run with
/// other scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub range: Range<usize>,
    pub cjk: bool,
}

pub fn runs(text: &str) -> Vec<Run> {
    let mut out: Vec<Run> = Vec::new();
    let mut current: Option<Run> = None;
    for (i, c) in text.char_indices() {
        let end = i + c.len_utf8();
        if !c.is_alphanumeric() {
            out.extend(current.take());
            continue;
        }
        let cjk = is_cjk(c);
        match current.as_mut() {
            Some(run) if run.cjk == cjk => run.range.end = end,
            _ => {
                out.extend(current.take());
                current = Some(Run { range: i..end, cjk });
            }
        }
    }
    out.extend(current);
    out
}

/// Byte ranges of the character bigrams of a CJK run, relative to the run.
/// A one-character run yields itself. With `unigrams`, every single
/// character is emitted as well.
pub fn cjk_grams(run: &str, unigrams: bool) -> Vec<Range<usize>> {
    let chars: Vec<(usize, char)> = run.char_indices().collect();
    let end_of = |k: usize| chars[k].0 + chars[k].1.len_utf8();
    let mut grams = Vec::new();
    for k in 0..chars.len() {
        if unigrams || chars.len() == 1 {
            grams.push(chars[k].0..end_of(k));
        }
        if k + 1 < chars.len() {
            grams.push(chars[k].0..end_of(k + 1));
        }
    }
    grams
}

/// Splits on non-alphanumeric characters like `SimpleTokenizer`, but indexes
/// CJK runs as overlapping unigrams and bigrams so words inside an unbroken
/// run of Chinese text stay findable.
#[derive(Debug, Clone, Default)]
pub struct MixedScriptTokenizer;

pub struct MixedScriptTokenStream {
    tokens: std::vec::IntoIter<Token>,
    token: Token,
}

impl Tokenizer for MixedScriptTokenizer {
    type TokenStream<'a> = MixedScriptTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> MixedScriptTokenStream {
        let mut tokens = Vec::new();
        let mut push = |range: Range<usize>| {
            tokens.push(Token {
                offset_from: range.start,
                offset_to: range.end,
                position: tokens.len(),
                text: text[range].to_string(),
                position_length: 1,
            });
        };
        for run in runs(text) {
            if run.cjk {
                let base = run.range.start;
                for gram in cjk_grams(&text[run.range], true) {
                    push(base + gram.start..base + gram.end);
                }
            } else {
                push(run.range);
            }
        }
        MixedScriptTokenStream { tokens: tokens.into_iter(), token: Token::default() }
    }
}

impl TokenStream for MixedScriptTokenStream {
    fn advance(&mut self) -> bool {
        match self.tokens.next() {
            Some(token) => {
                self.token = token;
                true
            }
            None => false,
        }
    }

    fn token(&self) -> &Token { &self.token }

    fn token_mut(&mut self) -> &mut Token { &mut self.token }
}
