//! # Strata Configuration
//!
//! Runtime configuration for protocol stacks: the sync marker value, frame
//! size limit, allocation mode and resynchronization strategy.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use strata_config::StackConfig;
//!
//! // File values, then STRATA_* environment overrides, then defaults
//! let config = StackConfig::load(Some("config/stack.toml".as_ref()))?;
//! assert!(config.max_frame_size > 0);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod defaults;
pub mod stack_config;

// Re-export commonly used types
pub use stack_config::{AllocationMode, ResyncStrategy, StackConfig};
