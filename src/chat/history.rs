// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ordered conversation history.

use serde::Serialize;
use uuid::Uuid;

use super::message::ChatMessage;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Remove any message sharing `message.id`, then append `message`.
    ///
    /// The refreshed message always ends up last, even if the previous
    /// version sat earlier in the sequence.
    pub fn upsert_to_tail(&mut self, message: ChatMessage) {
        self.messages.retain(|m| m.id != message.id);
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn get(&self, id: &Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == *id)
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
