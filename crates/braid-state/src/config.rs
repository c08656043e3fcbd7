//! Host configuration loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;

use braid_core::ProcessSetup;

use crate::error::StateError;

/// Largest block size a host may request.
pub const MAX_BLOCK_SIZE: usize = 8192;

/// Audio and queue settings for a running graph.
///
/// Every field has a default, so an empty file is a valid config.
///
/// ```toml
/// sample_rate = 44100
/// block_size = 256
/// num_channels = 2
/// latency_queue_capacity = 64
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Largest block the host will render.
    pub block_size: usize,
    /// Bus channel count, 1 or 2.
    pub num_channels: usize,
    /// Capacity of the audio-to-control latency queue.
    pub latency_queue_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 512,
            num_channels: 2,
            latency_queue_capacity: 64,
        }
    }
}

impl HostConfig {
    /// Parse and validate a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, StateError> {
        let config: HostConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| StateError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), ?config, "host config loaded");
        Ok(config)
    }

    /// Convert the config to a TOML string.
    pub fn to_toml(&self) -> Result<String, StateError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), StateError> {
        if !(8000..=384_000).contains(&self.sample_rate) {
            return Err(StateError::InvalidConfig(format!(
                "sample_rate {} outside 8000..=384000",
                self.sample_rate
            )));
        }
        if !(1..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err(StateError::InvalidConfig(format!(
                "block_size {} outside 1..={MAX_BLOCK_SIZE}",
                self.block_size
            )));
        }
        if !(1..=2).contains(&self.num_channels) {
            return Err(StateError::InvalidConfig(format!(
                "num_channels {} is not 1 or 2",
                self.num_channels
            )));
        }
        if self.latency_queue_capacity == 0 {
            return Err(StateError::InvalidConfig(
                "latency_queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Bus layout for the graph.
    pub fn process_setup(&self) -> ProcessSetup {
        ProcessSetup::new(self.sample_rate as f32, self.block_size, self.num_channels)
    }
}
