// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caller-facing chat surface.
//!
//! Ties the document store, retriever and generation coordinator together
//! behind the operations a presentation layer needs. Every failure is turned
//! into a value here: `false` for model loads and document adds, error text
//! in the assistant message for generation.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use super::history::ChatHistory;
use super::message::ChatMessage;
use crate::config::{ModelSettings, SettingsProvider, StaticSettingsProvider};
use crate::inference::{GenerationCoordinator, GenerationOutcome, Generator};
use crate::rag::{
    compose, Document, DocumentStore, FileTextSource, RagError, Retriever, TextSource,
    DEFAULT_TOP_K,
};

/// Successive snapshots of the whole message sequence for one query.
pub type SnapshotStream = UnboundedReceiverStream<Vec<ChatMessage>>;

/// The model currently held by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub is_loaded: bool,
}

struct Inner {
    coordinator: GenerationCoordinator,
    store: Arc<DocumentStore>,
    retriever: Retriever,
    source: Arc<dyn TextSource>,
    settings: Arc<dyn SettingsProvider>,
    history: Mutex<ChatHistory>,
    current_model: Mutex<Option<ModelInfo>>,
    generating: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Clears the generating flag however the query task ends.
struct GeneratingGuard(Arc<Inner>);

impl Drop for GeneratingGuard {
    fn drop(&mut self) {
        self.0.generating.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct ChatService {
    inner: Arc<Inner>,
}

impl ChatService {
    /// Service reading documents from the filesystem, with in-memory settings
    pub fn new(generator: Arc<dyn Generator>, settings: ModelSettings) -> Self {
        Self::with_parts(
            generator,
            Arc::new(StaticSettingsProvider::new(settings)),
            Arc::new(DocumentStore::new()),
            Arc::new(FileTextSource),
        )
    }

    pub fn with_parts(
        generator: Arc<dyn Generator>,
        settings: Arc<dyn SettingsProvider>,
        store: Arc<DocumentStore>,
        source: Arc<dyn TextSource>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                coordinator: GenerationCoordinator::new(generator),
                retriever: Retriever::new(Arc::clone(&store)),
                store,
                source,
                settings,
                history: Mutex::new(ChatHistory::new()),
                current_model: Mutex::new(None),
                generating: AtomicBool::new(false),
            }),
        }
    }

    pub fn coordinator(&self) -> &GenerationCoordinator {
        &self.inner.coordinator
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.inner.store
    }

    // Model lifecycle

    pub async fn load_model(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let settings = self.inner.settings.snapshot();

        *lock(&self.inner.current_model) = None;
        if !self
            .inner
            .coordinator
            .load_model(path, settings.gpu_acceleration)
            .await
        {
            return false;
        }

        let size_bytes = tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        *lock(&self.inner.current_model) = Some(ModelInfo {
            name,
            path: path.to_path_buf(),
            size_bytes,
            is_loaded: true,
        });
        true
    }

    pub fn unload_model(&self) {
        self.inner.coordinator.unload_model();
        *lock(&self.inner.current_model) = None;
    }

    pub fn current_model(&self) -> Option<ModelInfo> {
        lock(&self.inner.current_model).clone()
    }

    pub fn is_model_loaded(&self) -> bool {
        self.inner.coordinator.is_loaded()
    }

    /// Fail the running generation, if any
    pub fn cancel_generation(&self) -> bool {
        self.inner.coordinator.cancel()
    }

    // Chat

    /// Append `content` as a user message and generate the assistant reply.
    ///
    /// Returns `None` when `content` is blank or a generation is already
    /// running. Otherwise the stream yields the message sequence once after
    /// the user message, once per generated fragment, and once more if the
    /// final text differs from the last fragment snapshot. It ends when the
    /// session ends.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn send_query(&self, content: &str) -> Option<SnapshotStream> {
        if content.trim().is_empty() {
            debug!("Ignoring blank query");
            return None;
        }
        if self
            .inner
            .generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Query rejected: a generation is already running");
            return None;
        }
        let guard = GeneratingGuard(Arc::clone(&self.inner));

        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut history = lock(&self.inner.history);
            history.push(ChatMessage::user(content));
            let _ = tx.send(history.messages().to_vec());
        }

        let inner = Arc::clone(&self.inner);
        let content = content.to_string();
        tokio::spawn(async move {
            inner.answer(&content, &tx).await;
            // Observers must see the flag cleared once their stream ends.
            drop(guard);
            drop(tx);
        });

        Some(UnboundedReceiverStream::new(rx))
    }

    pub fn is_generating(&self) -> bool {
        self.inner.generating.load(Ordering::Acquire)
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        lock(&self.inner.history).messages().to_vec()
    }

    pub fn clear_chat(&self) {
        lock(&self.inner.history).clear();
    }

    // Documents

    /// Read and store a document. Failures are logged and reported as `false`.
    pub async fn add_document(&self, source_ref: &str) -> bool {
        match self.try_add_document(source_ref).await {
            Ok(_) => true,
            Err(e) => {
                warn!(source_ref, error = %e, code = e.error_code(), "Failed to add document");
                false
            }
        }
    }

    /// Read and store a document, leaving the store untouched on failure
    pub async fn try_add_document(&self, source_ref: &str) -> Result<Arc<Document>, RagError> {
        let text = self.inner.source.read(source_ref).await?;

        let store = Arc::clone(&self.inner.store);
        let document = tokio::task::spawn_blocking(move || {
            store.add(text.name, text.source_path, text.content)
        })
        .await
        .map_err(|e| RagError::Embedding(e.to_string()))?;

        info!(
            document_id = %document.id,
            name = %document.name,
            chars = document.content.chars().count(),
            total = self.inner.store.count(),
            "Document added"
        );
        Ok(document)
    }

    pub fn clear_documents(&self) {
        self.inner.store.clear();
    }

    pub fn document_count(&self) -> usize {
        self.inner.store.count()
    }

    pub fn documents(&self) -> Vec<Arc<Document>> {
        self.inner.store.snapshot()
    }

    pub fn search_relevant_documents(&self, query: &str, top_k: usize) -> Vec<Arc<Document>> {
        self.inner.retriever.search(query, top_k)
    }

    pub fn compose_augmented_prompt(&self, query: &str, documents: &[Arc<Document>]) -> String {
        compose(query, documents)
    }

    // Settings

    pub fn settings(&self) -> ModelSettings {
        self.inner.settings.snapshot()
    }

    /// Replace the in-memory settings. Takes effect at the next operation.
    pub fn update_settings(&self, settings: ModelSettings) {
        self.inner.settings.update(settings);
    }
}

impl Inner {
    async fn answer(&self, content: &str, tx: &mpsc::UnboundedSender<Vec<ChatMessage>>) {
        let settings = self.settings.snapshot();
        let prompt = if settings.enable_rag {
            let documents = self.retriever.search(content, DEFAULT_TOP_K);
            debug!(retrieved = documents.len(), "Augmenting prompt with documents");
            compose(content, &documents)
        } else {
            content.to_string()
        };

        let mut last_published: Option<String> = None;
        let outcome = self
            .coordinator
            .start(&prompt, &settings.sampling_params(), |update| {
                let snapshot = self.merge(update.message.clone());
                last_published = Some(update.message.content);
                let _ = tx.send(snapshot);
            })
            .await;

        if last_published.as_deref() != Some(outcome.text.as_str()) {
            let GenerationOutcome { message, .. } = outcome;
            let _ = tx.send(self.merge(message));
        }
    }

    fn merge(&self, message: ChatMessage) -> Vec<ChatMessage> {
        let mut history = lock(&self.history);
        history.upsert_to_tail(message);
        history.messages().to_vec()
    }
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("coordinator", &self.inner.coordinator)
            .field("documents", &self.inner.store.count())
            .field("generating", &self.is_generating())
            .finish()
    }
}
