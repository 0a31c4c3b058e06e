//! Default values for stack configuration
//!
//! These describe the reference wire format
//! `SYNC(2B) | SIZE(2B) | ID(1B) | PAYLOAD | CHECKSUM(2B)`.

/// Expected sync marker value
pub const SYNC_MARKER: u64 = 0xABCD;

/// Upper bound for the value carried in the size field
pub const MAX_FRAME_SIZE: usize = 4096;

/// Hard ceiling accepted by validation (16 MiB)
pub const MAX_FRAME_SIZE_LIMIT: usize = 16 * 1024 * 1024;

/// Initial capacity of the frame processor's input buffer
pub const INPUT_CAPACITY: usize = 8192;

pub const LOG_LEVEL: &str = "info";

/// Prefix for environment variable overrides, e.g. `STRATA_MAX_FRAME_SIZE`
pub const ENV_PREFIX: &str = "STRATA";
