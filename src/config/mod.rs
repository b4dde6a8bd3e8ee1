// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod provider;
pub mod settings;

pub use provider::{SettingsProvider, StaticSettingsProvider};
pub use settings::{ConfigError, ModelSettings};
