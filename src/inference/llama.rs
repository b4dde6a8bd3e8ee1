// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! GGUF model backend on llama.cpp.

use async_trait::async_trait;
use llama_cpp_2::{
    context::params::LlamaContextParams,
    llama_backend::LlamaBackend,
    llama_batch::LlamaBatch,
    model::{params::LlamaModelParams, AddBos, LlamaModel, Special},
    sampling::LlamaSampler,
};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use super::errors::GeneratorError;
use super::generator::{FragmentStream, Generator, ModelHandle, SamplingParams};

#[derive(Debug, Clone)]
pub struct LlamaConfig {
    pub context_size: u32,
    pub batch_size: usize,
    /// Layers offloaded when GPU acceleration is requested
    pub gpu_layers: u32,
    pub seed: u32,
}

impl Default for LlamaConfig {
    fn default() -> Self {
        Self {
            context_size: 4096,
            batch_size: 512,
            gpu_layers: 99,
            seed: 1234,
        }
    }
}

/// Strip bytes that break C string handling in the tokenizer
fn sanitize_prompt_for_tokenizer(prompt: &str) -> String {
    prompt
        .chars()
        .filter(|c| *c != '\0' && (*c >= ' ' || *c == '\t' || *c == '\n' || *c == '\r'))
        .collect()
}

pub struct LlamaGenerator {
    backend: Arc<LlamaBackend>,
    config: LlamaConfig,
}

impl LlamaGenerator {
    /// The llama.cpp backend may only be initialised once per process.
    pub fn new(config: LlamaConfig) -> Result<Self, GeneratorError> {
        let backend = LlamaBackend::init().map_err(|e| GeneratorError::ModelLoad {
            path: String::new(),
            reason: format!("failed to initialize backend: {e:?}"),
        })?;
        Ok(Self {
            backend: Arc::new(backend),
            config,
        })
    }
}

#[async_trait]
impl Generator for LlamaGenerator {
    async fn load(
        &self,
        path: &Path,
        gpu_acceleration: bool,
    ) -> Result<Arc<dyn ModelHandle>, GeneratorError> {
        let path = path.to_path_buf();
        let backend = Arc::clone(&self.backend);
        let gpu_layers = if gpu_acceleration {
            self.config.gpu_layers
        } else {
            0
        };

        let load_path = path.clone();
        let model = tokio::task::spawn_blocking(move || {
            let params = LlamaModelParams::default().with_n_gpu_layers(gpu_layers);
            LlamaModel::load_from_file(&backend, &load_path, &params)
        })
        .await
        .map_err(|e| model_load_error(&path, format!("loader task failed: {e}")))?
        .map_err(|e| model_load_error(&path, format!("{e:?}")))?;

        info!(path = %path.display(), gpu_layers, "GGUF model loaded");

        Ok(Arc::new(LlamaHandle {
            inner: Arc::new(LlamaInner {
                backend: Arc::clone(&self.backend),
                model,
                path,
                config: self.config.clone(),
            }),
        }))
    }
}

fn model_load_error(path: &Path, reason: String) -> GeneratorError {
    GeneratorError::ModelLoad {
        path: path.display().to_string(),
        reason,
    }
}

struct LlamaInner {
    backend: Arc<LlamaBackend>,
    model: LlamaModel,
    path: PathBuf,
    config: LlamaConfig,
}

struct LlamaHandle {
    inner: Arc<LlamaInner>,
}

impl ModelHandle for LlamaHandle {
    fn generate(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<FragmentStream, GeneratorError> {
        let (tx, rx) = mpsc::channel(100);
        let inner = Arc::clone(&self.inner);
        let prompt = sanitize_prompt_for_tokenizer(prompt);
        let params = params.clone();

        // LlamaContext is !Send, so the whole decode loop stays on one thread.
        tokio::task::spawn_blocking(move || {
            if let Err(e) = inner.decode(&prompt, &params, &tx) {
                warn!(model = %inner.path.display(), error = %e, "Decode loop failed");
                let _ = tx.blocking_send(Err(e));
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

impl LlamaInner {
    fn decode(
        &self,
        prompt: &str,
        params: &SamplingParams,
        tx: &mpsc::Sender<Result<String, GeneratorError>>,
    ) -> Result<(), GeneratorError> {
        let failed = |what: &str, e: &dyn std::fmt::Debug| {
            GeneratorError::Generation(format!("{what}: {e:?}"))
        };

        let prompt_tokens = self
            .model
            .str_to_token(prompt, AddBos::Always)
            .map_err(|e| failed("failed to tokenize", &e))?;
        if prompt_tokens.is_empty() {
            return Err(GeneratorError::Generation("prompt is empty".to_string()));
        }
        let context_size = self.config.context_size as usize;
        if prompt_tokens.len() >= context_size {
            return Err(GeneratorError::Generation(format!(
                "prompt has {} tokens, context window is {}",
                prompt_tokens.len(),
                context_size
            )));
        }

        let ctx_params = LlamaContextParams::default()
            .with_n_ctx(NonZeroU32::new(self.config.context_size))
            .with_n_batch(self.config.batch_size.max(prompt_tokens.len()) as u32);
        let mut context = self
            .model
            .new_context(&self.backend, ctx_params)
            .map_err(|e| failed("failed to create context", &e))?;

        let mut batch = LlamaBatch::new(self.config.batch_size.max(prompt_tokens.len()), 1);
        let last = prompt_tokens.len() - 1;
        for (i, &token) in prompt_tokens.iter().enumerate() {
            batch
                .add(token, i as i32, &[0], i == last)
                .map_err(|e| failed("failed to add token to batch", &e))?;
        }
        context
            .decode(&mut batch)
            .map_err(|e| failed("decode failed", &e))?;

        let mut sampler = LlamaSampler::chain_simple([
            LlamaSampler::top_k(params.top_k as i32),
            LlamaSampler::top_p(params.top_p, 1),
            LlamaSampler::temp(params.temperature),
            LlamaSampler::dist(self.config.seed),
        ]);

        let eos = self.model.token_eos();
        let limit = (prompt_tokens.len() + params.max_tokens as usize).min(context_size);
        let mut n_cur = prompt_tokens.len();
        debug!(prompt_tokens = prompt_tokens.len(), limit, "Starting decode loop");

        while n_cur < limit {
            let token = sampler.sample(&context, batch.n_tokens() - 1);
            sampler.accept(token);
            if token == eos {
                debug!(generated = n_cur - prompt_tokens.len(), "EOS reached");
                break;
            }

            // Tokens that are not valid UTF-8 on their own are skipped, but the
            // model state still advances.
            if let Ok(piece) = self.model.token_to_str(token, Special::Plaintext) {
                if !piece.is_empty() && tx.blocking_send(Ok(piece)).is_err() {
                    debug!("Fragment receiver dropped, stopping generation");
                    return Ok(());
                }
            }

            batch.clear();
            batch
                .add(token, n_cur as i32, &[0], true)
                .map_err(|e| failed("failed to add token", &e))?;
            context
                .decode(&mut batch)
                .map_err(|e| failed("decode failed", &e))?;
            n_cur += 1;
        }
        Ok(())
    }
}
