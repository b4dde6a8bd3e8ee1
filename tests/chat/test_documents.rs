// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Document management through the chat service

use rag_chat_core::chat::ChatService;
use rag_chat_core::config::ModelSettings;
use rag_chat_core::inference::ScriptedGenerator;
use rag_chat_core::rag::{RagError, DEFAULT_TOP_K};
use std::sync::Arc;
use tempfile::TempDir;

fn service() -> ChatService {
    ChatService::new(Arc::new(ScriptedGenerator::new(["ok"])), ModelSettings::default())
}

fn write_doc(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_paris_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let service = service();
    assert_eq!(service.document_count(), 0);

    let path = write_doc(&dir, "paris.txt", "Paris is the capital of France");
    assert!(service.add_document(&path).await);
    assert_eq!(service.document_count(), 1);

    let found = service.search_relevant_documents("capital of France", DEFAULT_TOP_K);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "paris.txt");
    assert_eq!(found[0].content, "Paris is the capital of France");

    let prompt = service.compose_augmented_prompt("capital of France", &found);
    assert!(prompt.contains("Document: paris.txt\nParis is the capital of France"));
    assert_eq!(prompt.matches("User query: capital of France").count(), 1);
}

#[tokio::test]
async fn test_unreadable_source_returns_false() {
    let dir = tempfile::tempdir().unwrap();
    let service = service();
    let missing = dir.path().join("missing.txt");

    assert!(!service.add_document(&missing.to_string_lossy()).await);
    assert_eq!(service.document_count(), 0);

    let err = service
        .try_add_document(&missing.to_string_lossy())
        .await
        .unwrap_err();
    assert!(err.is_io_failure());
    assert!(matches!(err, RagError::Io { .. }));
}

#[tokio::test]
async fn test_documents_keep_source_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let service = service();
    let path = write_doc(&dir, "notes.md", "# Notes\nRust ownership rules");

    let document = service.try_add_document(&path).await.unwrap();

    assert_eq!(document.name, "notes.md");
    assert!(std::path::Path::new(&document.source_path).is_absolute());
    assert!(document.source_path.ends_with("notes.md"));
    assert_eq!(service.documents()[0].id, document.id);
}

#[tokio::test]
async fn test_clear_documents() {
    let dir = tempfile::tempdir().unwrap();
    let service = service();
    for i in 0..4 {
        let path = write_doc(&dir, &format!("{i}.txt"), &format!("document number {i}"));
        assert!(service.add_document(&path).await);
    }
    assert_eq!(service.document_count(), 4);
    assert_eq!(service.search_relevant_documents("document", DEFAULT_TOP_K).len(), 3);

    service.clear_documents();
    assert_eq!(service.document_count(), 0);
    assert!(service.search_relevant_documents("document", DEFAULT_TOP_K).is_empty());
}
