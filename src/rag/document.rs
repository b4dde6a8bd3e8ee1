// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document held by the [`DocumentStore`](super::DocumentStore).
///
/// Immutable once created. The embedding is computed at insertion and never
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub source_path: String,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub added_at: DateTime<Utc>,
}

impl Document {
    /// Build a document with a fresh id.
    pub fn new(
        name: impl Into<String>,
        source_path: impl Into<String>,
        content: impl Into<String>,
        embedding: Option<Vec<f32>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            source_path: source_path.into(),
            content: content.into(),
            embedding,
            added_at: Utc::now(),
        }
    }

    /// At most the first `max_chars` characters of the content.
    pub fn excerpt(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => &self.content[..byte_idx],
            None => &self.content,
        }
    }
}
