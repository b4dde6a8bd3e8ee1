// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod chat;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod inference;
pub mod rag;

pub use chat::{ChatHistory, ChatMessage, ChatService, ModelInfo, Role, SnapshotStream};
pub use config::{ConfigError, ModelSettings, SettingsProvider, StaticSettingsProvider};
pub use embeddings::{cosine_similarity, HashingEmbedder, TextEmbedder, EMBEDDING_DIMENSION};
pub use inference::{
    GenerationCoordinator, GenerationOutcome, Generator, GeneratorError, ModelHandle,
    SamplingParams, ScriptedGenerator, SessionStatus,
};
pub use rag::{Document, DocumentStore, RagError, Retriever, DEFAULT_TOP_K};
