//! The search facade: owns the corpus snapshot, the result cache and the
//! analytics log of one engine instance.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use docsearch_core::config::SearchConfig;
use docsearch_core::error::{Error, Result};
use docsearch_core::processor::DocumentProcessor;
use docsearch_core::traits::{DocumentStore, Embedder, KeywordIndex, KeywordIndexer};
use docsearch_core::types::{
    AnalyticsRecord, CacheStats, DocId, Document, EngineStats, PopularQuery, SearchFilters, SearchMetadata,
    SearchMode, SearchOptions, SearchResponse, SearchResult,
};
use docsearch_text::{extract_highlights, QueryOptimizer, TantivyIndexer};
use docsearch_vector::{semantic_search, EmbeddingMatrix};

use crate::analytics::AnalyticsLog;
use crate::cache::{cache_key, now_ms, CachedSearch, SearchCache};
use crate::filter::{apply_min_score, filtered_positions};
use crate::modes::{exact_search, fuzzy_search, keyword_results};
use crate::rank::{combine, sort_results, BlendWeights};

/// Everything built from one corpus load. Read-only once published.
struct Corpus<I> {
    generation: u64,
    documents: Vec<Arc<Document>>,
    matrix: EmbeddingMatrix,
    keyword: I,
    positions: HashMap<DocId, usize>,
}

struct ModeOutcome {
    results: Vec<SearchResult>,
    semantic_count: usize,
    keyword_count: usize,
}

pub struct HybridSearchEngine<KI: KeywordIndexer = TantivyIndexer> {
    config: SearchConfig,
    optimizer: QueryOptimizer,
    embedder: Box<dyn Embedder>,
    indexer: KI,
    corpus: RwLock<Option<Arc<Corpus<KI::Index>>>>,
    generations: AtomicU64,
    cache: SearchCache,
    analytics: AnalyticsLog,
}

impl HybridSearchEngine<TantivyIndexer> {
    pub fn with_tantivy(config: SearchConfig, embedder: Box<dyn Embedder>) -> Result<Self> {
        let indexer = TantivyIndexer::new(config.min_match_char_length);
        Self::new(config, embedder, indexer)
    }
}

impl<KI: KeywordIndexer> HybridSearchEngine<KI> {
    pub fn new(config: SearchConfig, embedder: Box<dyn Embedder>, indexer: KI) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            optimizer: QueryOptimizer::new(config.spell_check),
            cache: SearchCache::new(config.cache_expiry_ms),
            analytics: AnalyticsLog::new(config.analytics_cap),
            config,
            embedder,
            indexer,
            corpus: RwLock::new(None),
            generations: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &SearchConfig { &self.config }

    fn blend(&self) -> BlendWeights {
        BlendWeights { semantic: self.config.semantic_weight, keyword: self.config.keyword_weight }
    }

    // The slot is only ever replaced whole, so a poisoned lock still holds a
    // consistent value.
    fn snapshot(&self) -> Result<Arc<Corpus<KI::Index>>> {
        let slot = self.corpus.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(Arc::clone).ok_or(Error::EngineNotInitialized)
    }

    fn publish(&self, corpus: Option<Arc<Corpus<KI::Index>>>) {
        *self.corpus.write().unwrap_or_else(PoisonError::into_inner) = corpus;
        if let Err(e) = self.cache.clear() {
            warn!(error = %e, "failed to clear search cache");
        }
    }

    pub fn is_initialized(&self) -> bool { self.snapshot().is_ok() }

    /// Embed and index `documents`, then swap them in as the searchable
    /// corpus. On error the previous corpus stays in place.
    #[instrument(level = "info", skip_all, fields(documents = documents.len()))]
    pub fn initialize(&self, documents: Vec<Document>) -> Result<usize> {
        let mut seen = HashSet::new();
        if let Some(dup) = documents.iter().find(|d| !seen.insert(d.id.as_str())) {
            return Err(Error::InvalidDocument(format!("duplicate document id '{}'", dup.id)));
        }
        let documents: Vec<Arc<Document>> = documents.into_iter().map(Arc::new).collect();
        let dim = self.embedder.dim();

        let rows = if documents.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<String> = documents.iter().map(|d| d.embedding_text()).collect();
            self.embedder.embed_batch(&texts).map_err(|e| Error::EmbeddingFailure(e.to_string()))?
        };
        if rows.len() != documents.len() {
            return Err(Error::EmbeddingFailure(format!(
                "embedder returned {} rows for {} documents",
                rows.len(),
                documents.len()
            )));
        }
        let matrix = EmbeddingMatrix::from_rows(&rows, dim).map_err(|e| Error::EmbeddingFailure(e.to_string()))?;
        drop(rows);

        let keyword = self
            .indexer
            .build(&documents, &self.config.field_weights)
            .map_err(|e| Error::KeywordIndex(e.to_string()))?;
        let positions = documents.iter().enumerate().map(|(i, d)| (d.id.clone(), i)).collect();

        let count = documents.len();
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(Some(Arc::new(Corpus { generation, documents, matrix, keyword, positions })));
        info!(documents = count, dim, "search engine initialized");
        Ok(count)
    }

    /// Read, normalize and validate a store's documents, then initialize.
    /// Documents failing validation are skipped.
    pub fn load_from_store(&self, store: &dyn DocumentStore) -> Result<usize> {
        let raw = store.get_all().map_err(|e| Error::Store(format!("{e:#}")))?;
        let total = raw.len();
        let processed = DocumentProcessor::new().process_documents(raw);
        let valid: Vec<Document> = processed
            .into_iter()
            .filter(|doc| match DocumentProcessor::validate(doc) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "skipping document");
                    false
                }
            })
            .collect();
        debug!(total, valid = valid.len(), "documents loaded from store");
        self.initialize(valid)
    }

    /// Drop the corpus and cached results.
    pub fn dispose(&self) {
        self.publish(None);
        info!("search engine disposed");
    }

    #[instrument(level = "debug", skip(self, options), fields(mode = ?options.mode, query_len = query.len()))]
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let corpus = self.snapshot()?;
        let started = Instant::now();
        let optimized = self.optimizer.optimize(query);
        if optimized.is_empty() {
            debug!("query empty after optimization");
            let metadata = self.metadata(0.0, &[], 0, 0, optimized, options);
            return Ok(respond(Vec::new(), metadata, options.include_metadata));
        }

        let key = if self.config.enable_cache { self.key_for(&optimized, options) } else { None };
        if let Some(key) = &key {
            match self.cache.get(key, corpus.generation, now_ms()) {
                Ok(Some(hit)) => {
                    debug!("cache hit");
                    return Ok(respond(hit.results, hit.metadata, options.include_metadata));
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "cache lookup failed"),
            }
        }

        let positions = filtered_positions(&corpus.documents, &options.filters);
        let outcome = self.run_mode(&corpus, &positions, &optimized, options.mode).await?;

        let results = apply_min_score(outcome.results, options.filters.min_score);
        let mut results = sort_results(results, options.sort_by, &optimized, self.config.title_boost);
        if options.enable_highlight {
            for r in &mut results {
                r.highlights = extract_highlights(&r.document, &optimized, self.config.max_highlights);
            }
        }
        if let Some(max) = options.filters.max_results.filter(|&max| max > 0) {
            results.truncate(max);
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let metadata =
            self.metadata(elapsed_ms, &results, outcome.semantic_count, outcome.keyword_count, optimized, options);
        if let Some(key) = key {
            let entry = CachedSearch { results: results.clone(), metadata: metadata.clone() };
            // A rebuild may have published a newer corpus meanwhile; the
            // generation keeps these results from being served against it.
            if let Err(e) = self.cache.insert(key, entry, corpus.generation, now_ms()) {
                warn!(error = %e, "cache store failed");
            }
        }
        self.record_analytics(&metadata);
        debug!(results = results.len(), elapsed_ms, "search complete");
        Ok(respond(results, metadata, options.include_metadata))
    }

    fn key_for(&self, query: &str, options: &SearchOptions) -> Option<String> {
        cache_key(query, options).map_err(|e| warn!(error = %e, "cache key unavailable")).ok()
    }

    fn metadata(
        &self,
        search_time_ms: f64,
        results: &[SearchResult],
        semantic_result_count: usize,
        keyword_result_count: usize,
        query: String,
        options: &SearchOptions,
    ) -> SearchMetadata {
        SearchMetadata {
            search_time_ms,
            total_results: results.len(),
            semantic_result_count,
            keyword_result_count,
            query,
            mode: options.mode,
            filters: options.filters.clone(),
        }
    }

    fn record_analytics(&self, metadata: &SearchMetadata) {
        if !self.config.enable_analytics {
            return;
        }
        let record = AnalyticsRecord {
            query: metadata.query.clone(),
            result_count: metadata.total_results,
            search_time_ms: metadata.search_time_ms,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.analytics.record(record) {
            warn!(error = %e, "analytics record failed");
        }
    }

    async fn run_mode(
        &self,
        corpus: &Corpus<KI::Index>,
        positions: &[usize],
        query: &str,
        mode: SearchMode,
    ) -> Result<ModeOutcome> {
        let max_highlights = self.config.max_highlights;
        let outcome = match mode {
            SearchMode::Semantic => {
                let results = self.semantic(corpus, positions, query)?;
                ModeOutcome { semantic_count: results.len(), keyword_count: 0, results }
            }
            SearchMode::Keyword => {
                let results = self.keyword(corpus, positions, query)?;
                ModeOutcome { semantic_count: 0, keyword_count: results.len(), results }
            }
            SearchMode::Fuzzy => {
                let results = fuzzy_search(query, &subset(corpus, positions), max_highlights);
                ModeOutcome { semantic_count: 0, keyword_count: results.len(), results }
            }
            SearchMode::Exact => {
                let results = exact_search(query, &subset(corpus, positions), max_highlights);
                ModeOutcome { semantic_count: 0, keyword_count: 0, results }
            }
            SearchMode::Hybrid => {
                let (semantic, keyword) = futures::join!(
                    async { self.semantic(corpus, positions, query) },
                    async { self.keyword(corpus, positions, query) },
                );
                let (semantic, keyword) = (semantic?, keyword?);
                let (semantic_count, keyword_count) = (semantic.len(), keyword.len());
                ModeOutcome { results: combine(semantic, keyword, self.blend()), semantic_count, keyword_count }
            }
        };
        Ok(outcome)
    }

    fn semantic(&self, corpus: &Corpus<KI::Index>, positions: &[usize], query: &str) -> Result<Vec<SearchResult>> {
        if positions.is_empty() {
            return Ok(Vec::new());
        }
        let embedding = self
            .embedder
            .embed_batch(&[query.to_string()])
            .map_err(|e| Error::EmbeddingFailure(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingFailure("embedder returned no rows for the query".into()))?;

        let documents = subset(corpus, positions);
        let selected;
        let matrix = if positions.len() == corpus.documents.len() {
            &corpus.matrix
        } else {
            selected = corpus.matrix.select(positions).map_err(|e| Error::Operation(e.to_string()))?;
            &selected
        };
        let results = semantic_search(&embedding, &documents, matrix, self.config.semantic_threshold)
            .map_err(|e| Error::EmbeddingFailure(e.to_string()))?;
        Ok(results
            .into_iter()
            .map(|r| {
                let highlights = extract_highlights(&r.document, query, self.config.max_highlights);
                r.with_highlights(highlights)
            })
            .collect())
    }

    fn keyword(&self, corpus: &Corpus<KI::Index>, positions: &[usize], query: &str) -> Result<Vec<SearchResult>> {
        if positions.is_empty() {
            return Ok(Vec::new());
        }
        let hits = corpus.keyword.search(query).map_err(|e| Error::KeywordIndex(e.to_string()))?;
        let mut admitted = vec![false; corpus.documents.len()];
        for &p in positions {
            admitted[p] = true;
        }
        Ok(keyword_results(hits, &corpus.documents, &corpus.positions, &admitted, self.config.max_highlights))
    }

    /// Title and tag completions for a partial query, in corpus order.
    pub fn get_suggestions(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let corpus = self.snapshot()?;
        let needle = query.trim().to_lowercase();
        if needle.chars().count() < self.config.min_suggestion_query_length || limit == 0 {
            return Ok(Vec::new());
        }
        let mut seen = HashSet::new();
        let mut suggestions = Vec::new();
        let mut push = |s: String| {
            if seen.insert(s.clone()) {
                suggestions.push(s);
            }
        };
        for doc in &corpus.documents {
            if doc.title.to_lowercase().contains(&needle) {
                push(doc.title.clone());
            }
            for tag in doc.tags.iter().filter(|t| t.to_lowercase().contains(&needle)) {
                push(format!("{} {}", doc.category, tag));
                push(format!("how to use {tag}"));
            }
        }
        suggestions.truncate(limit);
        Ok(suggestions)
    }

    /// Hybrid neighbours of a document by its title and tags. Unknown ids
    /// have no neighbours.
    pub async fn related_documents(&self, id: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let corpus = self.snapshot()?;
        let Some(target) = corpus.positions.get(id).map(|&p| Arc::clone(&corpus.documents[p])) else {
            return Ok(Vec::new());
        };
        let query = format!("{} {}", target.title, target.tags.join(" "));
        let options = SearchOptions::default()
            .with_mode(SearchMode::Hybrid)
            .with_filters(SearchFilters::default().with_max_results(limit.saturating_add(1)));
        let response = self.search(&query, &options).await?;
        Ok(response.results.into_iter().filter(|r| r.document.id != id).take(limit).collect())
    }

    pub fn clear_cache(&self) -> Result<()> { self.cache.clear() }

    pub fn cache_stats(&self) -> Result<CacheStats> { self.cache.stats() }

    pub fn purge_expired_cache(&self) -> Result<usize> { self.cache.purge_expired(now_ms()) }

    /// The full analytics log, oldest first.
    pub fn analytics(&self) -> Result<Vec<AnalyticsRecord>> { self.analytics.all() }

    pub fn search_history(&self, limit: usize) -> Result<Vec<AnalyticsRecord>> { self.analytics.history(limit) }

    pub fn popular_searches(&self, limit: usize) -> Result<Vec<PopularQuery>> { self.analytics.popular(limit) }

    pub fn clear_analytics(&self) -> Result<()> { self.analytics.clear() }

    pub fn stats(&self) -> Result<EngineStats> {
        let corpus = self.snapshot()?;
        Ok(EngineStats {
            document_count: corpus.documents.len(),
            embedding_dim: corpus.matrix.dim(),
            categories: DocumentProcessor::category_counts(corpus.documents.iter().map(|d| &**d)),
            cache_entries: self.cache.len()?,
            analytics_records: self.analytics.len()?,
        })
    }
}

fn subset<I>(corpus: &Corpus<I>, positions: &[usize]) -> Vec<Arc<Document>> {
    positions.iter().map(|&p| Arc::clone(&corpus.documents[p])).collect()
}

fn respond(results: Vec<SearchResult>, metadata: SearchMetadata, include_metadata: bool) -> SearchResponse {
    SearchResponse { results, metadata: include_metadata.then_some(metadata) }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstEmbedder;

    impl Embedder for ConstEmbedder {
        fn dim(&self) -> usize { 2 }

        fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn grid() -> Document {
        Document {
            id: "grid".into(),
            title: "CSS Grid".into(),
            content: "Grid places items in rows and columns.".into(),
            url: "https://docs.example/grid".into(),
            category: "CSS".into(),
            tags: vec!["layout".into()],
            summary: String::new(),
        }
    }

    #[tokio::test]
    async fn broken_cache_and_analytics_do_not_fail_searches() {
        let engine = HybridSearchEngine::with_tantivy(SearchConfig::default(), Box::new(ConstEmbedder)).unwrap();
        engine.initialize(vec![grid()]).unwrap();
        engine.cache.poison();
        engine.analytics.poison();

        for _ in 0..2 {
            let response = engine.search("grid", &SearchOptions::default()).await.unwrap();
            let ids: Vec<&str> = response.results.iter().map(|r| r.document.id.as_str()).collect();
            assert_eq!(ids, vec!["grid"]);
        }
        assert!(matches!(engine.cache_stats(), Err(Error::Cache(_))));
        assert!(matches!(engine.analytics(), Err(Error::Cache(_))));
        // Publishing a new corpus only warns about the cache.
        assert_eq!(engine.initialize(vec![grid()]).unwrap(), 1);
    }

    #[test]
    fn each_load_gets_a_new_generation() {
        let engine = HybridSearchEngine::with_tantivy(SearchConfig::default(), Box::new(ConstEmbedder)).unwrap();
        engine.initialize(vec![grid()]).unwrap();
        let first = engine.snapshot().unwrap().generation;
        engine.initialize(vec![grid()]).unwrap();
        assert!(engine.snapshot().unwrap().generation > first);
    }
}
