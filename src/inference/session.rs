// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! State of one prompt-to-completion generation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::errors::GeneratorError;
use super::generator::SamplingParams;
use crate::chat::{ChatMessage, Role};

/// `Idle -> Running -> {Completed, Failed}`. `Idle -> Failed` happens when no
/// model is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct GenerationSession {
    id: Uuid,
    prompt: String,
    params: SamplingParams,
    assistant_message_id: Uuid,
    assistant_created_at: Option<DateTime<Utc>>,
    accumulated_text: String,
    fragment_count: usize,
    status: SessionStatus,
    started_at: Option<Instant>,
}

impl GenerationSession {
    pub fn new(prompt: impl Into<String>, params: SamplingParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            params,
            assistant_message_id: Uuid::new_v4(),
            assistant_created_at: None,
            accumulated_text: String::new(),
            fragment_count: 0,
            status: SessionStatus::Idle,
            started_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn params(&self) -> &SamplingParams {
        &self.params
    }

    pub fn assistant_message_id(&self) -> Uuid {
        self.assistant_message_id
    }

    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// `Idle -> Running`. Returns false if the session already started.
    pub fn begin(&mut self) -> bool {
        if self.status != SessionStatus::Idle {
            tracing::warn!(session_id = %self.id, status = ?self.status, "Ignoring begin on started session");
            return false;
        }
        self.status = SessionStatus::Running;
        self.started_at = Some(Instant::now());
        true
    }

    /// Append a fragment and return the refreshed assistant message.
    ///
    /// Only valid while running; otherwise the fragment is dropped.
    pub fn push_fragment(&mut self, fragment: &str) -> Option<ChatMessage> {
        if self.status != SessionStatus::Running {
            tracing::warn!(session_id = %self.id, status = ?self.status, "Dropping fragment for session that is not running");
            return None;
        }
        self.accumulated_text.push_str(fragment);
        self.fragment_count += 1;
        Some(self.assistant_message(self.accumulated_text.clone()))
    }

    /// `Running -> Completed`, yielding the accumulated text.
    pub fn complete(&mut self) -> String {
        if self.status == SessionStatus::Running {
            self.status = SessionStatus::Completed;
        } else {
            tracing::warn!(session_id = %self.id, status = ?self.status, "Ignoring complete on session that is not running");
        }
        self.accumulated_text.clone()
    }

    /// Any non-terminal state `-> Failed`, yielding the error text that
    /// replaces the assistant message content.
    pub fn fail(&mut self, error: &GeneratorError) -> String {
        if !self.status.is_terminal() {
            self.status = SessionStatus::Failed;
        }
        error.user_message()
    }

    /// The assistant message carrying `content`, keeping the creation time of
    /// its first version.
    pub fn assistant_message(&mut self, content: String) -> ChatMessage {
        let created_at = *self.assistant_created_at.get_or_insert_with(Utc::now);
        ChatMessage {
            id: self.assistant_message_id,
            content,
            role: Role::Assistant,
            created_at,
        }
    }
}
