// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Chat history and the caller-facing service
pub mod history;
pub mod message;
pub mod service;

pub use history::ChatHistory;
pub use message::{ChatMessage, Role};
pub use service::{ChatService, ModelInfo, SnapshotStream};
