// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Contract for the external text generator.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::errors::GeneratorError;

/// Lazy, finite, non-restartable sequence of generated text fragments.
pub type FragmentStream = BoxStream<'static, Result<String, GeneratorError>>;

/// Sampling parameters forwarded to the generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            max_tokens: 2048,
        }
    }
}

/// Loads models. Owned by the [`GenerationCoordinator`](super::GenerationCoordinator),
/// which keeps at most one model loaded at a time.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn load(
        &self,
        path: &Path,
        gpu_acceleration: bool,
    ) -> Result<Arc<dyn ModelHandle>, GeneratorError>;

    /// Release a model. Resources go away once the last clone of the handle
    /// is dropped, which may be a stream still draining.
    fn unload(&self, handle: Arc<dyn ModelHandle>) {
        drop(handle);
    }
}

/// A loaded model.
pub trait ModelHandle: Send + Sync {
    /// Start generating. Dropping the returned stream is a best-effort
    /// cancellation request.
    fn generate(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<FragmentStream, GeneratorError>;
}
