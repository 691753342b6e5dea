use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use docsearch_core::config::{expand_path, Config};
use docsearch_core::store::JsonDirStore;
use docsearch_core::types::{SearchFilters, SearchMode, SearchOptions, SearchResult, SortBy};
use docsearch_embed::{default_embedder, DEFAULT_DIM};
use docsearch_hybrid::HybridSearchEngine;

const USAGE: &str = "Usage: docsearch <search|suggest|related|stats> [QUERY|ID] [--corpus DIR] [--mode MODE] [--sort KEY] \
[--category C]... [--tag T]... [--min-score S] [--limit N] [--no-highlight] [--json] [--dim N]";

struct Args {
    command: String,
    positional: Option<String>,
    corpus: Option<PathBuf>,
    mode: SearchMode,
    sort: SortBy,
    categories: Vec<String>,
    tags: Vec<String>,
    min_score: Option<f32>,
    limit: Option<usize>,
    highlight: bool,
    json: bool,
    dim: Option<usize>,
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> anyhow::Result<String> {
    *i += 1;
    args.get(*i).cloned().ok_or_else(|| anyhow!("{flag} requires a value"))
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first().cloned() else { bail!(USAGE) };
    let mut parsed = Args {
        command,
        positional: None,
        corpus: None,
        mode: SearchMode::Hybrid,
        sort: SortBy::Relevance,
        categories: Vec::new(),
        tags: Vec::new(),
        min_score: None,
        limit: None,
        highlight: true,
        json: false,
        dim: None,
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--corpus" => parsed.corpus = Some(expand_path(take_value(&args, &mut i, "--corpus")?)),
            "--mode" => parsed.mode = take_value(&args, &mut i, "--mode")?.parse()?,
            "--sort" => parsed.sort = take_value(&args, &mut i, "--sort")?.parse()?,
            "--category" => parsed.categories.push(take_value(&args, &mut i, "--category")?),
            "--tag" => parsed.tags.push(take_value(&args, &mut i, "--tag")?),
            "--min-score" => parsed.min_score = Some(take_value(&args, &mut i, "--min-score")?.parse().context("--min-score")?),
            "--limit" => parsed.limit = Some(take_value(&args, &mut i, "--limit")?.parse().context("--limit")?),
            "--dim" => parsed.dim = Some(take_value(&args, &mut i, "--dim")?.parse().context("--dim")?),
            "--no-highlight" => parsed.highlight = false,
            "--json" => parsed.json = true,
            "-h" | "--help" => bail!(USAGE),
            other if other.starts_with('-') => bail!("unknown flag {other}\n{USAGE}"),
            other => {
                // Unquoted multi-word queries arrive as several arguments.
                parsed.positional = Some(match parsed.positional.take() {
                    Some(prev) => format!("{prev} {other}"),
                    None => other.to_string(),
                });
            }
        }
        i += 1;
    }
    Ok(parsed)
}

fn print_results(results: &[SearchResult]) {
    for (rank, r) in results.iter().enumerate() {
        println!("{:>2}. [{:.3}] {} ({}) {}", rank + 1, r.score, r.document.title, r.document.category, r.document.url);
        for h in &r.highlights {
            println!("      … {h}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    let args = parse_args()?;
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let search_config = config.search()?;
    let corpus_dir = args.corpus.clone().unwrap_or_else(|| {
        let dir: String = config.get("data.corpus_dir").unwrap_or_else(|_| "./docs".to_string());
        expand_path(dir)
    });
    let dim = args.dim.unwrap_or_else(|| config.get("embed.dim").unwrap_or(DEFAULT_DIM));

    let engine = HybridSearchEngine::with_tantivy(search_config.clone(), default_embedder(dim)?)?;
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.set_message(format!("Indexing {}", corpus_dir.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let loaded = engine.load_from_store(&JsonDirStore::new(corpus_dir.clone()));
    spinner.finish_and_clear();
    let count = loaded?;
    tracing::info!(documents = count, corpus = %corpus_dir.display(), "corpus ready");

    let runtime = tokio::runtime::Runtime::new()?;
    match args.command.as_str() {
        "search" => {
            let query = args.positional.clone().ok_or_else(|| anyhow!("search needs a query\n{USAGE}"))?;
            let mut filters = SearchFilters::default();
            if !args.categories.is_empty() {
                filters = filters.with_categories(args.categories.clone());
            }
            if !args.tags.is_empty() {
                filters = filters.with_tags(args.tags.clone());
            }
            filters.min_score = args.min_score;
            filters.max_results = Some(args.limit.unwrap_or(10));
            let options = SearchOptions {
                enable_highlight: args.highlight,
                ..SearchOptions::default().with_mode(args.mode).with_sort(args.sort).with_filters(filters)
            };
            let response = runtime.block_on(engine.search(&query, &options))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                if let Some(meta) = &response.metadata {
                    println!(
                        "{} results for '{}' ({:?}, {:.1} ms; semantic {}, keyword {})",
                        meta.total_results,
                        meta.query,
                        meta.mode,
                        meta.search_time_ms,
                        meta.semantic_result_count,
                        meta.keyword_result_count
                    );
                }
                print_results(&response.results);
            }
        }
        "suggest" => {
            let query = args.positional.clone().unwrap_or_default();
            let suggestions = engine.get_suggestions(&query, args.limit.unwrap_or(search_config.max_suggestions))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&suggestions)?);
            } else {
                suggestions.iter().for_each(|s| println!("{s}"));
            }
        }
        "related" => {
            let id = args.positional.clone().ok_or_else(|| anyhow!("related needs a document id\n{USAGE}"))?;
            let related = runtime.block_on(engine.related_documents(&id, args.limit.unwrap_or(5)))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&related)?);
            } else {
                print_results(&related);
            }
        }
        "stats" => {
            let stats = engine.stats()?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Documents: {}  Embedding dim: {}", stats.document_count, stats.embedding_dim);
                for (category, n) in &stats.categories {
                    println!("  {category}: {n}");
                }
            }
        }
        other => bail!("unknown command {other}\n{USAGE}"),
    }
    Ok(())
}
