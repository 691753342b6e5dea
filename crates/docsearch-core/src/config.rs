//! Configuration loader, search tunables and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! The `search` section deserializes into [`SearchConfig`]; every field has a
//! default so partial files are fine.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::types::FieldWeights;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The `search` section, or defaults when the section is absent.
    pub fn search(&self) -> Result<SearchConfig> {
        let config = if self.figment.find_value("search").is_ok() {
            self.get::<SearchConfig>("search").map_err(|e| Error::InvalidConfig(e.to_string()))?
        } else {
            SearchConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

/// Tunables of the hybrid search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Minimum cosine similarity for a semantic hit (inclusive).
    pub semantic_threshold: f32,
    pub semantic_weight: f32,
    pub keyword_weight: f32,
    pub field_weights: FieldWeights,
    /// Query tokens shorter than this are ignored by the keyword index.
    pub min_match_char_length: usize,
    /// Comparison-only multiplier for results whose title contains the query.
    pub title_boost: f32,
    pub max_highlights: usize,
    pub spell_check: bool,
    pub enable_cache: bool,
    pub cache_expiry_ms: i64,
    pub enable_analytics: bool,
    /// Once exceeded, the log is compacted to the newest `analytics_cap / 2`.
    pub analytics_cap: usize,
    pub max_suggestions: usize,
    pub min_suggestion_query_length: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: 0.3,
            semantic_weight: 0.7,
            keyword_weight: 0.3,
            field_weights: FieldWeights::default(),
            min_match_char_length: 2,
            title_boost: 1.5,
            max_highlights: 3,
            spell_check: true,
            enable_cache: true,
            cache_expiry_ms: 300_000,
            enable_analytics: true,
            analytics_cap: 1000,
            max_suggestions: 8,
            min_suggestion_query_length: 2,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("semantic_weight", self.semantic_weight),
            ("keyword_weight", self.keyword_weight),
            ("field_weights.title", self.field_weights.title),
            ("field_weights.content", self.field_weights.content),
            ("field_weights.tags", self.field_weights.tags),
            ("field_weights.summary", self.field_weights.summary),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!("{name} must be a non-negative number, got {value}")));
            }
        }
        if self.field_weights.total() <= 0.0 {
            return Err(Error::InvalidConfig("field weights must not all be zero".to_string()));
        }
        if !self.title_boost.is_finite() || self.title_boost <= 0.0 {
            return Err(Error::InvalidConfig(format!("title_boost must be positive, got {}", self.title_boost)));
        }
        if self.max_highlights == 0 {
            return Err(Error::InvalidConfig("max_highlights must be at least 1".to_string()));
        }
        if self.analytics_cap < 2 {
            return Err(Error::InvalidConfig(format!("analytics_cap must be at least 2, got {}", self.analytics_cap)));
        }
        if self.cache_expiry_ms < 0 {
            return Err(Error::InvalidConfig("cache_expiry_ms must not be negative".to_string()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
