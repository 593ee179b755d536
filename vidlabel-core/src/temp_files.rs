//! Temporary directory management utilities.
//!
//! Scratch staging directories are `tempfile::TempDir`s, so a crash or early
//! return still removes them when the owner is dropped.

use crate::config::{CoreConfig, STAGING_DIR_PREFIX};
use crate::error::CoreResult;
use std::path::PathBuf;
use tempfile::{Builder as TempFileBuilder, TempDir};

/// Creates a scratch staging directory. Auto-cleaned when dropped.
pub fn create_staging_dir(config: &CoreConfig) -> CoreResult<TempDir> {
    let parent: PathBuf = config
        .scratch_parent
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&parent)?;

    let dir = TempFileBuilder::new()
        .prefix(STAGING_DIR_PREFIX)
        .tempdir_in(&parent)?;
    log::debug!("Created scratch staging directory {}", dir.path().display());
    Ok(dir)
}
