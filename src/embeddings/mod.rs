// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deterministic text embeddings used by document retrieval.
//!
//! [`HashingEmbedder`] maps text onto a fixed number of buckets by hashing
//! each token, weights every occurrence by `1 / (position + 1)`, then
//! unit-normalizes the result. Two runs over the same input always yield
//! bit-identical vectors, which the retrieval tests depend on.
//!
//! Distinct tokens whose hashes land in the same bucket share a component.
//! This is accepted; changing the hash or the bucket rule would change every
//! stored vector.

pub mod similarity;

pub use similarity::{cosine_similarity, dot_product, magnitude};

use anyhow::{anyhow, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Default embedding dimensionality.
pub const EMBEDDING_DIMENSION: usize = 384;

/// Anything that can turn text into a fixed-length vector.
pub trait TextEmbedder: Send + Sync {
    /// Length of every vector returned by [`embed`](TextEmbedder::embed).
    fn dimension(&self) -> usize;

    /// Embed `text`. Must be pure and deterministic.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Bag-of-hashed-tokens embedder.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(anyhow!("Embedding dimension must be greater than 0"));
        }
        if dimension > i32::MAX as usize {
            return Err(anyhow!(
                "Embedding dimension {} exceeds the hash range",
                dimension
            ));
        }
        Ok(Self { dimension })
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: EMBEDDING_DIMENSION,
        }
    }
}

impl TextEmbedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();

        for (index, token) in tokenize(&lowered).enumerate() {
            let bucket = bucket_for(string_hash(token), self.dimension);
            embedding[bucket] += 1.0 / (index as f32 + 1.0);
        }

        // Each square is taken in f32 and widened; only the sum runs in f64.
        let norm = embedding
            .iter()
            .map(|v| (v * v) as f64)
            .sum::<f64>()
            .sqrt() as f32;
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z0-9_]+").unwrap())
}

/// Split already lower-cased text into maximal runs of word characters.
///
/// Word characters are ASCII letters, digits and underscore. Everything else,
/// including non-ASCII letters, separates tokens.
pub fn tokenize(lowered: &str) -> impl Iterator<Item = &str> {
    token_pattern().find_iter(lowered).map(|m| m.as_str())
}

/// 32-bit polynomial string hash (`h = 31 * h + unit`) over UTF-16 code
/// units, wrapping on overflow.
pub fn string_hash(token: &str) -> i32 {
    token
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Map a signed hash into `[0, dimension)`.
pub fn bucket_for(hash: i32, dimension: usize) -> usize {
    let d = dimension as i64;
    let mut bucket = (hash as i64) % d;
    if bucket < 0 {
        bucket += d;
    }
    bucket as usize
}
