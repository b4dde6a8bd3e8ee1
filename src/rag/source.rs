// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Readers that turn an external reference into document text.

use async_trait::async_trait;
use std::path::Path;

use super::errors::RagError;

/// Text read from an external source, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceText {
    pub name: String,
    pub source_path: String,
    pub content: String,
}

/// Supplies document text for an opaque reference (a path, a picked file, ...).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn read(&self, source_ref: &str) -> Result<SourceText, RagError>;
}

/// Reads UTF-8 files from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileTextSource;

#[async_trait]
impl TextSource for FileTextSource {
    async fn read(&self, source_ref: &str) -> Result<SourceText, RagError> {
        let path = Path::new(source_ref);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| RagError::InvalidSource(source_ref.to_string()))?;

        let absolute = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| RagError::io(source_ref, e))?;
        let content = tokio::fs::read_to_string(&absolute)
            .await
            .map_err(|e| RagError::io(source_ref, e))?;

        Ok(SourceText {
            name,
            source_path: absolute.to_string_lossy().into_owned(),
            content,
        })
    }
}
