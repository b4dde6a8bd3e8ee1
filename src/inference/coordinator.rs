// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Drives one generation session at a time against the loaded model.
//!
//! The coordinator owns the loaded-model slot exclusively: at most one model
//! is loaded, and loading a new one releases the previous one first. Failures
//! never escape as errors. A failed load reports `false`, and a failed
//! session reports its error text as the final message content.
//!
//! Unloading (or [`cancel`](GenerationCoordinator::cancel)) while a session
//! is running force-fails that session: it stops polling the generator,
//! transitions to `Failed`, and returns the matching error text.

use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::GeneratorError;
use super::generator::{Generator, ModelHandle, SamplingParams};
use super::session::{GenerationSession, SessionStatus};
use crate::chat::ChatMessage;

/// Final text of a session started with no model loaded.
pub const MODEL_NOT_LOADED: &str = "Error: Model not loaded";

/// Delivered once per fragment, in arrival order.
#[derive(Debug, Clone)]
pub struct FragmentUpdate<'a> {
    /// The newly arrived fragment only
    pub fragment: &'a str,
    /// The assistant message with all text accumulated so far
    pub message: ChatMessage,
}

/// Result of a finished session.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub session_id: Uuid,
    pub status: SessionStatus,
    /// Accumulated text on success, error text on failure
    pub text: String,
    pub fragment_count: usize,
    /// Assistant message carrying `text`
    pub message: ChatMessage,
}

impl GenerationOutcome {
    pub fn assistant_message_id(&self) -> Uuid {
        self.message.id
    }

    pub fn is_failed(&self) -> bool {
        self.status == SessionStatus::Failed
    }
}

struct LoadedModel {
    handle: Arc<dyn ModelHandle>,
    path: PathBuf,
}

struct ActiveSession {
    id: Uuid,
    token: CancellationToken,
    reason: Option<GeneratorError>,
}

pub struct GenerationCoordinator {
    generator: Arc<dyn Generator>,
    model: Mutex<Option<LoadedModel>>,
    active: Mutex<Option<ActiveSession>>,
    status: Mutex<SessionStatus>,
}

// Guarded values are replaced whole, never left half-written.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl GenerationCoordinator {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            model: Mutex::new(None),
            active: Mutex::new(None),
            status: Mutex::new(SessionStatus::Idle),
        }
    }

    pub fn is_loaded(&self) -> bool {
        lock(&self.model).is_some()
    }

    pub fn loaded_model_path(&self) -> Option<PathBuf> {
        lock(&self.model).as_ref().map(|m| m.path.clone())
    }

    /// Status of the current session, or of the last one if none is running
    pub fn status(&self) -> SessionStatus {
        *lock(&self.status)
    }

    pub fn is_running(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Release any loaded model, then load the one at `path`
    pub async fn load_model(&self, path: impl AsRef<Path>, gpu_acceleration: bool) -> bool {
        self.try_load_model(path, gpu_acceleration).await.is_ok()
    }

    pub async fn try_load_model(
        &self,
        path: impl AsRef<Path>,
        gpu_acceleration: bool,
    ) -> Result<(), GeneratorError> {
        let path = path.as_ref();
        info!(path = %path.display(), gpu_acceleration, "Loading model");

        self.unload_model();

        match self.generator.load(path, gpu_acceleration).await {
            Ok(handle) => {
                let previous = lock(&self.model).replace(LoadedModel {
                    handle,
                    path: path.to_path_buf(),
                });
                if let Some(previous) = previous {
                    // A concurrent load finished first; keep only the newest.
                    self.generator.unload(previous.handle);
                }
                info!(path = %path.display(), "Model loaded successfully");
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, code = e.error_code(), "Model load failed");
                Err(e)
            }
        }
    }

    /// Release the loaded model unconditionally
    ///
    /// A running session is force-failed with [`GeneratorError::Unloaded`].
    pub fn unload_model(&self) {
        // Held across the interrupt so a session cannot register between the
        // interrupt and the release.
        let previous = {
            let mut model = lock(&self.model);
            self.interrupt(GeneratorError::Unloaded);
            model.take()
        };
        if let Some(previous) = previous {
            info!(path = %previous.path.display(), "Unloading model");
            self.generator.unload(previous.handle);
        }
    }

    /// Fail the running session, if any, with [`GeneratorError::Cancelled`]
    pub fn cancel(&self) -> bool {
        self.interrupt(GeneratorError::Cancelled)
    }

    fn interrupt(&self, reason: GeneratorError) -> bool {
        let mut active = lock(&self.active);
        match active.as_mut() {
            Some(session) => {
                warn!(session_id = %session.id, reason = %reason, "Interrupting running session");
                session.reason.get_or_insert(reason);
                session.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Run one session to completion
    ///
    /// `on_fragment` is called for every fragment, in the order the generator
    /// produced them. The coordinator assumes callers never start a second
    /// session while one is running.
    pub async fn start<F>(
        &self,
        prompt: &str,
        params: &SamplingParams,
        mut on_fragment: F,
    ) -> GenerationOutcome
    where
        F: FnMut(FragmentUpdate<'_>) + Send,
    {
        let mut session = GenerationSession::new(prompt, params.clone());

        let token = CancellationToken::new();
        let handle = self.register(session.id(), &token);
        let Some(handle) = handle else {
            let text = session.fail(&GeneratorError::NotLoaded);
            warn!(session_id = %session.id(), "Generation requested with no model loaded");
            *lock(&self.status) = session.status();
            return Self::outcome(&mut session, text);
        };

        session.begin();
        *lock(&self.status) = SessionStatus::Running;
        debug!(
            session_id = %session.id(),
            prompt_len = prompt.len(),
            max_tokens = params.max_tokens,
            "Generation started"
        );

        let _active = ActiveGuard {
            coordinator: self,
            session_id: session.id(),
        };

        let text = self
            .drive(&mut session, handle.as_ref(), &token, &mut on_fragment)
            .await;
        *lock(&self.status) = session.status();

        info!(
            session_id = %session.id(),
            status = ?session.status(),
            fragments = session.fragment_count(),
            elapsed_ms = session.elapsed().as_millis() as u64,
            "Generation finished"
        );
        Self::outcome(&mut session, text)
    }

    /// Clone the loaded handle and register the session under one model lock,
    /// so an unload either sees the session or happens before it starts.
    fn register(&self, id: Uuid, token: &CancellationToken) -> Option<Arc<dyn ModelHandle>> {
        let model = lock(&self.model);
        let handle = Arc::clone(&model.as_ref()?.handle);
        *lock(&self.active) = Some(ActiveSession {
            id,
            token: token.clone(),
            reason: None,
        });
        Some(handle)
    }

    async fn drive<F>(
        &self,
        session: &mut GenerationSession,
        handle: &dyn ModelHandle,
        token: &CancellationToken,
        on_fragment: &mut F,
    ) -> String
    where
        F: FnMut(FragmentUpdate<'_>) + Send,
    {
        let mut stream = match handle.generate(session.prompt(), session.params()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(session_id = %session.id(), error = %e, "Generator failed to start");
                return session.fail(&e);
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    let reason = self.interrupt_reason(session.id());
                    return session.fail(&reason);
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(fragment)) => {
                    if let Some(message) = session.push_fragment(&fragment) {
                        on_fragment(FragmentUpdate {
                            fragment: &fragment,
                            message,
                        });
                    }
                }
                Some(Err(e)) => {
                    warn!(
                        session_id = %session.id(),
                        error = %e,
                        fragments = session.fragment_count(),
                        "Generation failed"
                    );
                    return session.fail(&e);
                }
                None => return session.complete(),
            }
        }
    }

    fn interrupt_reason(&self, session_id: Uuid) -> GeneratorError {
        lock(&self.active)
            .as_ref()
            .filter(|a| a.id == session_id)
            .and_then(|a| a.reason.clone())
            .unwrap_or(GeneratorError::Cancelled)
    }

    fn outcome(session: &mut GenerationSession, text: String) -> GenerationOutcome {
        GenerationOutcome {
            session_id: session.id(),
            status: session.status(),
            fragment_count: session.fragment_count(),
            message: session.assistant_message(text.clone()),
            text,
        }
    }
}

/// Deregisters the running session, even when the caller drops `start`
/// before it finishes.
struct ActiveGuard<'a> {
    coordinator: &'a GenerationCoordinator,
    session_id: Uuid,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let mut active = lock(&self.coordinator.active);
        if active.as_ref().map(|a| a.id) == Some(self.session_id) {
            *active = None;
        }
        drop(active);

        let mut status = lock(&self.coordinator.status);
        if *status == SessionStatus::Running {
            *status = SessionStatus::Failed;
        }
    }
}

impl std::fmt::Debug for GenerationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationCoordinator")
            .field("loaded_model", &self.loaded_model_path())
            .field("status", &self.status())
            .finish()
    }
}
