// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Generation sessions and the generator contract they run against
pub mod coordinator;
pub mod errors;
pub mod generator;
#[cfg(feature = "llama")]
pub mod llama;
pub mod scripted;
pub mod session;

pub use coordinator::{FragmentUpdate, GenerationCoordinator, GenerationOutcome, MODEL_NOT_LOADED};
pub use errors::GeneratorError;
pub use generator::{FragmentStream, Generator, ModelHandle, SamplingParams};
#[cfg(feature = "llama")]
pub use llama::{LlamaConfig, LlamaGenerator};
pub use scripted::ScriptedGenerator;
pub use session::{GenerationSession, SessionStatus};
