// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RAG (Retrieval-Augmented Generation) module
// In-memory document storage, similarity search and prompt augmentation

pub mod document;
pub mod document_store;
pub mod errors;
pub mod prompt;
pub mod retriever;
pub mod source;

pub use document::Document;
pub use document_store::DocumentStore;
pub use errors::RagError;
pub use prompt::{compose, MAX_EXCERPT_CHARS};
pub use retriever::{Retriever, ScoredDocument, DEFAULT_TOP_K};
pub use source::{FileTextSource, SourceText, TextSource};
