// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generation and retrieval settings

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::inference::SamplingParams;

/// Errors raised while loading or validating settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid settings: {0}")]
    Invalid(String),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
}

/// Snapshot of the user's model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    /// Number of candidate tokens kept before sampling
    pub top_k: u32,
    /// Maximum tokens generated per reply
    pub max_tokens: u32,
    pub repeat_penalty: f32,
    /// Model context window in tokens
    pub context_length: u32,
    /// Offload layers to the GPU when loading a model
    pub gpu_acceleration: bool,
    /// Augment prompts with retrieved documents
    pub enable_rag: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            max_tokens: 2048,
            repeat_penalty: 1.1,
            context_length: 4096,
            gpu_acceleration: true,
            enable_rag: false,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

impl ModelSettings {
    /// Load settings from environment variables
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            temperature: env_or("RAG_TEMPERATURE", defaults.temperature),
            top_p: env_or("RAG_TOP_P", defaults.top_p),
            top_k: env_or("RAG_TOP_K", defaults.top_k),
            max_tokens: env_or("RAG_MAX_TOKENS", defaults.max_tokens),
            repeat_penalty: env_or("RAG_REPEAT_PENALTY", defaults.repeat_penalty),
            context_length: env_or("RAG_CONTEXT_LENGTH", defaults.context_length),
            gpu_acceleration: env_flag("RAG_GPU_ACCELERATION", defaults.gpu_acceleration),
            enable_rag: env_flag("RAG_ENABLE_RAG", defaults.enable_rag),
        }
    }

    /// Parse a TOML document; keys that are absent take their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.temperature >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be >= 0, got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be greater than 0".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.context_length == 0 {
            return Err(ConfigError::Invalid(
                "context_length must be greater than 0".to_string(),
            ));
        }
        if !(self.repeat_penalty > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "repeat_penalty must be > 0, got {}",
                self.repeat_penalty
            )));
        }
        Ok(())
    }

    /// The subset of settings handed to the generator
    pub fn sampling_params(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_tokens: self.max_tokens,
        }
    }
}
