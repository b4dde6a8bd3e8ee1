// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Augmented prompt composition

use rag_chat_core::rag::{compose, Document, MAX_EXCERPT_CHARS};
use std::sync::Arc;

fn doc(name: &str, content: &str) -> Arc<Document> {
    Arc::new(Document::new(name, format!("/docs/{name}"), content, None))
}

#[test]
fn test_empty_retrieval_returns_query() {
    let query = "What is the capital of France?";
    assert_eq!(compose(query, &[]), query);
}

#[test]
fn test_long_content_is_truncated_to_500_chars() {
    let content: String = "0123456789".repeat(100);
    assert_eq!(content.chars().count(), 1000);

    let prompt = compose("q", &[doc("long.txt", &content)]);

    assert!(prompt.contains(&content[..MAX_EXCERPT_CHARS]));
    assert!(!prompt.contains(&content[..MAX_EXCERPT_CHARS + 1]));
}

#[test]
fn test_truncation_counts_characters_not_bytes() {
    let content = "é".repeat(600);
    let prompt = compose("q", &[doc("accents.txt", &content)]);
    let excerpt = "é".repeat(MAX_EXCERPT_CHARS);

    assert!(prompt.contains(&format!("Document: accents.txt\n{excerpt}\n")));
    assert!(!prompt.contains(&"é".repeat(MAX_EXCERPT_CHARS + 1)));
}

#[test]
fn test_truncation_counts_astral_characters_once() {
    let content = "😀".repeat(600);
    let prompt = compose("q", &[doc("emoji.txt", &content)]);
    let excerpt = "😀".repeat(MAX_EXCERPT_CHARS);

    assert!(prompt.contains(&format!("Document: emoji.txt\n{excerpt}\n")));
    assert!(!prompt.contains(&"😀".repeat(MAX_EXCERPT_CHARS + 1)));
}

#[test]
fn test_documents_keep_order_and_query_appears_once() {
    let query = "unique-query-marker";
    let prompt = compose(
        query,
        &[doc("first.txt", "one"), doc("second.txt", "two"), doc("third.txt", "three")],
    );

    let first = prompt.find("Document: first.txt").unwrap();
    let second = prompt.find("Document: second.txt").unwrap();
    let third = prompt.find("Document: third.txt").unwrap();
    assert!(first < second && second < third);
    assert_eq!(prompt.matches(query).count(), 1);
    assert!(prompt.starts_with("Context from documents"));
    assert!(prompt.contains(&format!("User query: {query}")));
    assert!(prompt.contains("Document: first.txt\none\n\nDocument: second.txt\ntwo"));
}

#[test]
fn test_short_content_is_not_padded() {
    let prompt = compose("q", &[doc("short.txt", "tiny")]);
    assert!(prompt.contains("Document: short.txt\ntiny\n\nUser query: q"));
}
