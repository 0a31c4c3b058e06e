//! Stack Configuration Module
//!
//! Runtime values for protocol stacks and frame processors. Loaded from an
//! optional TOML file with `STRATA_*` environment variable overrides; every
//! key has a default so an empty source yields the reference stack.

use crate::defaults;
use anyhow::{ensure, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Where the id layer places newly constructed messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// Box every message; any number may be in flight
    #[default]
    Heap,
    /// Construct into one pre-reserved slot; one live message at a time
    InPlace,
}

/// How the processing loop skips input it cannot decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResyncStrategy {
    /// Drop exactly one byte and retry
    #[default]
    DropOne,
    /// Drop up to the next byte equal to the sync marker's first byte
    ScanForSync,
}

/// Stack and processor configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StackConfig {
    /// Expected sync marker, truncated to the sync layer's width at build time
    pub sync_marker: u64,

    /// Largest value the size field may carry
    pub max_frame_size: usize,

    /// Size field counts the trailing checksum
    pub size_covers_checksum: bool,

    pub allocation: AllocationMode,

    pub resync: ResyncStrategy,

    /// Initial input buffer capacity for frame processors
    pub input_capacity: usize,

    /// Default tracing filter for tools, overridden by `RUST_LOG`
    pub log_level: String,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            sync_marker: defaults::SYNC_MARKER,
            max_frame_size: defaults::MAX_FRAME_SIZE,
            size_covers_checksum: true,
            allocation: AllocationMode::default(),
            resync: ResyncStrategy::default(),
            input_capacity: defaults::INPUT_CAPACITY,
            log_level: defaults::LOG_LEVEL.to_string(),
        }
    }
}

impl StackConfig {
    /// Load configuration from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading stack config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (STRATA_ prefix)
        builder = builder.add_source(
            Environment::with_prefix(defaults::ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .context("Failed to build stack configuration")?;

        let stack: StackConfig = config
            .try_deserialize()
            .context("Failed to deserialize stack configuration")?;

        stack.validate()?;
        debug!(?stack, "Stack configuration loaded");
        Ok(stack)
    }

    /// Parse configuration from TOML text, without environment overrides
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let stack: StackConfig =
            toml::from_str(text).context("Failed to parse stack configuration")?;
        stack.validate()?;
        Ok(stack)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize stack configuration")
    }

    /// Reject values no stack can be built with
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_frame_size > 0, "max_frame_size must be positive");
        ensure!(
            self.max_frame_size <= defaults::MAX_FRAME_SIZE_LIMIT,
            "max_frame_size {} exceeds limit {}",
            self.max_frame_size,
            defaults::MAX_FRAME_SIZE_LIMIT
        );
        ensure!(self.input_capacity > 0, "input_capacity must be positive");
        ensure!(!self.log_level.trim().is_empty(), "log_level must not be empty");
        Ok(())
    }
}
