//! Environment variable overrides for stack configuration
//!
//! Kept in its own test binary with a single test so setting process
//! environment variables cannot race other tests.

use std::fs;
use strata_config::{AllocationMode, ResyncStrategy, StackConfig};
use tempfile::tempdir;

#[test]
fn test_environment_overrides_file_values() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("stack.toml");
    fs::write(
        &path,
        "max_frame_size = 256\nallocation = \"heap\"\nresync = \"drop_one\"\n",
    )
    .expect("Failed to write config file");

    std::env::set_var("STRATA_MAX_FRAME_SIZE", "1024");
    std::env::set_var("STRATA_ALLOCATION", "in_place");
    std::env::set_var("STRATA_SIZE_COVERS_CHECKSUM", "false");

    let config = StackConfig::load(Some(&path)).expect("Failed to load config");

    std::env::remove_var("STRATA_MAX_FRAME_SIZE");
    std::env::remove_var("STRATA_ALLOCATION");
    std::env::remove_var("STRATA_SIZE_COVERS_CHECKSUM");

    assert_eq!(config.max_frame_size, 1024);
    assert_eq!(config.allocation, AllocationMode::InPlace);
    assert!(!config.size_covers_checksum);
    // file value survives when no override is present
    assert_eq!(config.resync, ResyncStrategy::DropOne);
}
