//! docsearch-embed
//!
//! Deterministic feature-hashing embedder. Each lowercased alphanumeric token
//! lands in one bucket of a fixed-size vector; the vector is L2-normalized.
//! Texts sharing vocabulary end up close in cosine space, which is enough for
//! local corpora and tests without shipping model weights.

use anyhow::{ensure, Result};
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use docsearch_core::traits::Embedder;

pub const DEFAULT_DIM: usize = 384;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    seed: u64,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        ensure!(dim > 0, "embedding dimension must be positive");
        Ok(Self { dim, seed: 0 })
    }

    /// Different seeds give unrelated vector spaces.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lowered = text.to_lowercase();
        let tokens = lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty());
        for (i, token) in tokens.enumerate() {
            let mut hasher = XxHash64::with_seed(self.seed);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32) * 0.5;
            v[idx] += val + (i % 3) as f32 * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

pub fn default_embedder(dim: usize) -> Result<Box<dyn Embedder>> {
    Ok(Box::new(HashEmbedder::new(dim)?))
}
