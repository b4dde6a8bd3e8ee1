// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for document ingestion and retrieval
//!
//! Covers failures while reading a document from its external source and
//! while embedding its content. Similarity scoring never fails: a dimension
//! mismatch scores `0.0` instead.

use thiserror::Error;

/// Errors that can occur while adding documents to the store
#[derive(Error, Debug)]
pub enum RagError {
    /// The external source could not be read
    #[error("Failed to read document source {source_ref}: {source}")]
    Io {
        source_ref: String,
        #[source]
        source: std::io::Error,
    },

    /// The source reference does not name anything readable
    #[error("Invalid document source: {0}")]
    InvalidSource(String),

    /// Embedding the content failed (worker panicked or was cancelled)
    #[error("Embedding failed: {0}")]
    Embedding(String),
}

impl RagError {
    pub fn io(source_ref: impl Into<String>, source: std::io::Error) -> Self {
        RagError::Io {
            source_ref: source_ref.into(),
            source,
        }
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::Io { .. } => "IO_FAILURE",
            RagError::InvalidSource(_) => "INVALID_SOURCE",
            RagError::Embedding(_) => "EMBEDDING_FAILED",
        }
    }

    /// Whether the failure came from reading the external source
    pub fn is_io_failure(&self) -> bool {
        matches!(self, RagError::Io { .. } | RagError::InvalidSource(_))
    }
}
