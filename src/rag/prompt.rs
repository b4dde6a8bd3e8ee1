// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval-augmented prompt construction.

use std::sync::Arc;

use super::document::Document;

/// Characters of each document's content included in the prompt.
///
/// Counted in `char`s (Unicode scalar values), so a character outside the
/// Basic Multilingual Plane counts once rather than as two UTF-16 units.
pub const MAX_EXCERPT_CHARS: usize = 500;

/// Wrap `original_query` with the excerpts of `retrieved`.
///
/// With nothing retrieved the query is returned untouched, so callers cannot
/// rely on the template always being present.
pub fn compose(original_query: &str, retrieved: &[Arc<Document>]) -> String {
    if retrieved.is_empty() {
        return original_query.to_string();
    }

    let context = retrieved
        .iter()
        .map(|doc| format!("Document: {}\n{}", doc.name, doc.excerpt(MAX_EXCERPT_CHARS)))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Context from documents:\n{}\n\nUser query: {}\n\nPlease answer the query using only the context provided above.",
        context, original_query
    )
}
