// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for model loading and text generation

use thiserror::Error;

/// Failures reported by a [`Generator`](super::Generator) or raised by the
/// coordinator around it
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    /// Missing or corrupt model file, unsupported format, insufficient resources
    #[error("Failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    /// The generator failed while producing fragments
    #[error("{0}")]
    Generation(String),

    /// Generation was requested with no model loaded
    #[error("Model not loaded")]
    NotLoaded,

    /// The caller cancelled the running session
    #[error("Generation cancelled")]
    Cancelled,

    /// The model was unloaded while a session was running
    #[error("Model unloaded during generation")]
    Unloaded,
}

impl GeneratorError {
    /// Text placed in the assistant message when a session fails
    pub fn user_message(&self) -> String {
        format!("Error: {}", self)
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            GeneratorError::ModelLoad { .. } => "MODEL_LOAD_FAILED",
            GeneratorError::Generation(_) => "GENERATION_FAILED",
            GeneratorError::NotLoaded => "MODEL_NOT_LOADED",
            GeneratorError::Cancelled => "CANCELLED",
            GeneratorError::Unloaded => "MODEL_UNLOADED",
        }
    }
}
