// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Document store behaviour

use rag_chat_core::embeddings::{HashingEmbedder, TextEmbedder};
use rag_chat_core::rag::DocumentStore;
use std::collections::HashSet;
use std::sync::Arc;

#[test]
fn test_add_embeds_and_counts() {
    let store = DocumentStore::new();
    assert!(store.is_empty());

    let doc = store.add("paris.txt", "/docs/paris.txt", "Paris is the capital of France");

    assert_eq!(store.count(), 1);
    assert_eq!(doc.name, "paris.txt");
    assert_eq!(doc.source_path, "/docs/paris.txt");
    assert_eq!(
        doc.embedding.as_deref(),
        Some(HashingEmbedder::default().embed("Paris is the capital of France").as_slice())
    );
    assert_eq!(store.get(&doc.id).unwrap().content, doc.content);
}

#[test]
fn test_ids_are_fresh_even_for_identical_content() {
    let store = DocumentStore::new();
    let ids: HashSet<_> = (0..50)
        .map(|_| store.add("same.txt", "/same.txt", "same content").id)
        .collect();
    assert_eq!(ids.len(), 50);
}

#[test]
fn test_concurrent_adds() {
    let store = Arc::new(DocumentStore::new());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..25 {
                    store.add(format!("{t}-{i}"), "/concurrent", format!("thread {t} doc {i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.count(), 200);
}
