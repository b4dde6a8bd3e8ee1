// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Brute-force cosine ranking over the document store.

use std::cmp::Ordering;
use std::sync::Arc;

use super::document::Document;
use super::document_store::DocumentStore;
use crate::embeddings::cosine_similarity;

/// Number of documents returned when the caller does not ask for a count.
pub const DEFAULT_TOP_K: usize = 3;

/// A document paired with its similarity to a query.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Arc<Document>,
    pub score: f32,
}

/// Ranks stored documents against a query.
#[derive(Debug, Clone)]
pub struct Retriever {
    store: Arc<DocumentStore>,
}

impl Retriever {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Score every stored document against `query`, best first.
    ///
    /// Ranks a snapshot, so concurrent inserts are either fully visible or not
    /// at all. The sort is stable: equal scores keep insertion order. A missing
    /// embedding scores as a zero vector.
    pub fn rank(&self, query: &str) -> Vec<ScoredDocument> {
        let documents = self.store.snapshot();
        if documents.is_empty() {
            return Vec::new();
        }

        let query_embedding = self.store.embedder().embed(query);
        let zero = vec![0.0f32; query_embedding.len()];

        let mut scored: Vec<ScoredDocument> = documents
            .into_iter()
            .map(|document| {
                let embedding = document.embedding.as_deref().unwrap_or(&zero);
                let score = cosine_similarity(&query_embedding, embedding);
                ScoredDocument { document, score }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored
    }

    /// The `top_k` most similar documents, best first.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<Arc<Document>> {
        let mut ranked = self.rank(query);
        ranked.truncate(top_k);

        tracing::debug!(
            top_k,
            returned = ranked.len(),
            best_score = ranked.first().map(|r| r.score),
            "Retrieved documents"
        );
        ranked.into_iter().map(|r| r.document).collect()
    }
}
