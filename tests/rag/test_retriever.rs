// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Retriever ranking and limits

use rag_chat_core::embeddings::cosine_similarity;
use rag_chat_core::rag::{Document, DocumentStore, Retriever, DEFAULT_TOP_K};
use std::sync::Arc;

fn retriever_over(docs: &[(&str, &str)]) -> (Arc<DocumentStore>, Retriever) {
    let store = Arc::new(DocumentStore::new());
    for (name, content) in docs {
        store.add(*name, format!("/docs/{name}"), *content);
    }
    let retriever = Retriever::new(Arc::clone(&store));
    (store, retriever)
}

#[test]
fn test_empty_store_returns_nothing() {
    let (_, retriever) = retriever_over(&[]);
    assert!(retriever.search("anything", DEFAULT_TOP_K).is_empty());
}

#[test]
fn test_never_exceeds_top_k_or_count() {
    let (store, retriever) = retriever_over(&[
        ("a", "apples and oranges"),
        ("b", "bananas"),
        ("c", "cherries"),
        ("d", "dates"),
        ("e", "elderberries"),
    ]);

    for top_k in 0..8 {
        let found = retriever.search("fruit apples", top_k);
        assert!(found.len() <= top_k);
        assert!(found.len() <= store.count());
    }
    assert_eq!(retriever.search("fruit", 0).len(), 0);
    assert_eq!(retriever.search("fruit", 100).len(), 5);
}

#[test]
fn test_ties_keep_insertion_order() {
    // None of these share a token with the query, so every score is 0.
    let (_, retriever) = retriever_over(&[("A", "xylophone"), ("B", "zeppelin"), ("C", "quokka")]);

    let names: Vec<String> = retriever
        .search("capital of france", DEFAULT_TOP_K)
        .iter()
        .map(|d| d.name.clone())
        .collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[test]
fn test_relevant_document_ranks_first() {
    let (_, retriever) = retriever_over(&[
        ("berlin.txt", "Berlin has many museums"),
        ("paris.txt", "Paris is the capital of France"),
        ("tokyo.txt", "Tokyo is a large city"),
    ]);

    let ranked = retriever.rank("capital of France");
    assert_eq!(ranked[0].document.name, "paris.txt");
    assert!(ranked[0].score > 0.0);
    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_missing_embedding_scores_zero() {
    let store = DocumentStore::new();
    let query = store.embedder().embed("anything");
    let unembedded = Document::new("raw", "/raw", "anything", None);
    let zero = vec![0.0f32; query.len()];
    assert_eq!(
        cosine_similarity(&query, unembedded.embedding.as_deref().unwrap_or(&zero)),
        0.0
    );
}
