// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Session-scoped document storage for RAG
// Documents live in memory for as long as the owning service and are never persisted

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::document::Document;
use crate::embeddings::{HashingEmbedder, TextEmbedder};

/// Ordered, in-memory document collection
/// - Insertion order is preserved and used as the tie-breaker when ranking
/// - Every insertion gets a fresh id
/// - Mutation is serialized against iteration: readers rank a snapshot
pub struct DocumentStore {
    embedder: Arc<dyn TextEmbedder>,
    documents: RwLock<Vec<Arc<Document>>>,
}

impl DocumentStore {
    /// Create an empty store using the default hashing embedder
    pub fn new() -> Self {
        Self::with_embedder(Arc::new(HashingEmbedder::default()))
    }

    pub fn with_embedder(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            embedder,
            documents: RwLock::new(Vec::new()),
        }
    }

    pub fn embedder(&self) -> &Arc<dyn TextEmbedder> {
        &self.embedder
    }

    /// Embed `content` and append a new document
    ///
    /// # Returns
    /// The stored record. The embedding is computed before the write lock is
    /// taken so concurrent searches are not held up by it.
    pub fn add(
        &self,
        name: impl Into<String>,
        source_path: impl Into<String>,
        content: impl Into<String>,
    ) -> Arc<Document> {
        let content = content.into();
        let embedding = self.embedder.embed(&content);
        let document = Arc::new(Document::new(name, source_path, content, Some(embedding)));

        self.write().push(Arc::clone(&document));

        tracing::debug!(
            document_id = %document.id,
            name = %document.name,
            "Document added to store"
        );
        document
    }

    /// Remove every document. Idempotent.
    pub fn clear(&self) {
        let mut documents = self.write();
        let removed = documents.len();
        documents.clear();
        tracing::debug!(removed, "Document store cleared");
    }

    /// Current number of stored documents
    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Get document by ID
    pub fn get(&self, id: &Uuid) -> Option<Arc<Document>> {
        self.read().iter().find(|d| d.id == *id).cloned()
    }

    /// Point-in-time copy of the collection in insertion order
    pub fn snapshot(&self) -> Vec<Arc<Document>> {
        self.read().clone()
    }

    // A panicking writer cannot leave the Vec half-updated, so a poisoned lock
    // still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<Document>>> {
        self.documents.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<Document>>> {
        self.documents.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("dimension", &self.embedder.dimension())
            .field("count", &self.count())
            .finish()
    }
}
