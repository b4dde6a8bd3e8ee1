// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deterministic in-process generator that replays a fixed script.
//!
//! Stands in for a real model wherever the exact fragment sequence matters:
//! coordinator and service tests, benches, and demos.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::errors::GeneratorError;
use super::generator::{FragmentStream, Generator, ModelHandle, SamplingParams};

#[derive(Debug, Default)]
struct CallCounters {
    loads: AtomicUsize,
    generates: AtomicUsize,
    unloads: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
struct Script {
    fragments: Vec<String>,
    fail_load: Option<String>,
    fail_on_start: Option<String>,
    fail_after: Option<(usize, String)>,
    stall_after: Option<usize>,
    delay: Option<Duration>,
}

/// Replays `fragments` for every prompt.
///
/// `load` fails when the model path does not exist, or always when
/// [`failing_load`](ScriptedGenerator::failing_load) was set.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    script: Script,
    counters: Arc<CallCounters>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Script {
                fragments: fragments.into_iter().map(Into::into).collect(),
                ..Script::default()
            },
            counters: Arc::new(CallCounters::default()),
        }
    }

    /// Every load fails with `reason`.
    pub fn failing_load(mut self, reason: impl Into<String>) -> Self {
        self.script.fail_load = Some(reason.into());
        self
    }

    /// `generate` itself returns an error.
    pub fn failing_on_start(mut self, message: impl Into<String>) -> Self {
        self.script.fail_on_start = Some(message.into());
        self
    }

    /// The stream yields `count` fragments, then an error.
    pub fn failing_after(mut self, count: usize, message: impl Into<String>) -> Self {
        self.script.fail_after = Some((count, message.into()));
        self
    }

    /// The stream yields `count` fragments, then never produces another item.
    pub fn stalling_after(mut self, count: usize) -> Self {
        self.script.stall_after = Some(count);
        self
    }

    /// Pause before each fragment.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.script.delay = Some(delay);
        self
    }

    pub fn load_count(&self) -> usize {
        self.counters.loads.load(Ordering::SeqCst)
    }

    pub fn generate_count(&self) -> usize {
        self.counters.generates.load(Ordering::SeqCst)
    }

    pub fn unload_count(&self) -> usize {
        self.counters.unloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn load(
        &self,
        path: &Path,
        _gpu_acceleration: bool,
    ) -> Result<Arc<dyn ModelHandle>, GeneratorError> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = &self.script.fail_load {
            return Err(GeneratorError::ModelLoad {
                path: path.display().to_string(),
                reason: reason.clone(),
            });
        }
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(GeneratorError::ModelLoad {
                path: path.display().to_string(),
                reason: "model file not found".to_string(),
            });
        }

        Ok(Arc::new(ScriptedHandle {
            script: self.script.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }

    fn unload(&self, handle: Arc<dyn ModelHandle>) {
        self.counters.unloads.fetch_add(1, Ordering::SeqCst);
        drop(handle);
    }
}

struct ScriptedHandle {
    script: Script,
    counters: Arc<CallCounters>,
}

impl ModelHandle for ScriptedHandle {
    fn generate(
        &self,
        _prompt: &str,
        _params: &SamplingParams,
    ) -> Result<FragmentStream, GeneratorError> {
        self.counters.generates.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.script.fail_on_start {
            return Err(GeneratorError::Generation(message.clone()));
        }

        let limit = [
            self.script.fail_after.as_ref().map(|(n, _)| *n),
            self.script.stall_after,
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(self.script.fragments.len());

        let mut items: Vec<Result<String, GeneratorError>> = self
            .script
            .fragments
            .iter()
            .take(limit)
            .cloned()
            .map(Ok)
            .collect();
        if let Some((_, message)) = &self.script.fail_after {
            items.push(Err(GeneratorError::Generation(message.clone())));
        }

        let delay = self.script.delay;
        let replay = stream::iter(items)
            .then(move |item| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                item
            })
            .boxed();

        if self.script.stall_after.is_some() && self.script.fail_after.is_none() {
            Ok(replay.chain(stream::pending()).boxed())
        } else {
            Ok(replay)
        }
    }
}
