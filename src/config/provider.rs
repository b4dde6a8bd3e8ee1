// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::RwLock;

use super::settings::ModelSettings;

/// Source of the current settings snapshot.
///
/// The core reads one snapshot at the start of each operation and never
/// holds on to it across operations.
pub trait SettingsProvider: Send + Sync {
    fn snapshot(&self) -> ModelSettings;

    fn update(&self, settings: ModelSettings);
}

/// Keeps the latest settings in memory.
#[derive(Debug, Default)]
pub struct StaticSettingsProvider {
    current: RwLock<ModelSettings>,
}

impl StaticSettingsProvider {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            current: RwLock::new(settings),
        }
    }
}

impl SettingsProvider for StaticSettingsProvider {
    fn snapshot(&self) -> ModelSettings {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn update(&self, settings: ModelSettings) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = settings;
    }
}
