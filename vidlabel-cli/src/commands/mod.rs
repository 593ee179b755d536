//! Command implementations for the CLI.
//!
//! Each submodule implements one subcommand; the helpers here build the
//! processor and load the input the same way for all of them.

pub mod compare;
pub mod extract;
pub mod info;
pub mod run;

use std::path::Path;

use anyhow::{Context, bail};
use log::info;
use vidlabel_core::config::CoreConfigBuilder;
use vidlabel_core::external::{CrateFfprobeExecutor, SidecarSpawner};
use vidlabel_core::storage::parse_bucket_uri;
use vidlabel_core::{FsObjectStore, ObjectStore, Processor, Video, check_dependency};

/// Processor wired to the real ffmpeg and ffprobe binaries.
pub type CliProcessor = Processor<SidecarSpawner, CrateFfprobeExecutor>;

/// Fails early when the external tools are missing.
pub fn check_tools() -> anyhow::Result<()> {
    for tool in ["ffmpeg", "ffprobe"] {
        check_dependency(tool).with_context(|| format!("'{tool}' must be installed and on PATH"))?;
    }
    info!("External dependency check passed.");
    Ok(())
}

/// Object store for `s3://` locations: a local directory when `store_root`
/// is given, otherwise S3 from the AWS environment.
pub fn open_store(store_root: Option<&Path>) -> anyhow::Result<Box<dyn ObjectStore>> {
    if let Some(root) = store_root {
        info!("Using directory object store at {}", root.display());
        return Ok(Box::new(FsObjectStore::new(root)));
    }
    open_s3_store()
}

#[cfg(feature = "s3")]
fn open_s3_store() -> anyhow::Result<Box<dyn ObjectStore>> {
    let store = vidlabel_core::S3ObjectStore::from_env().context("Failed to configure S3 client")?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "s3"))]
fn open_s3_store() -> anyhow::Result<Box<dyn ObjectStore>> {
    bail!("S3 support is not compiled in; pass --store-root to use a directory store")
}

/// Builds the processor, attaching an object store only when something
/// remote is involved.
pub fn build_processor(needs_store: bool, store_root: Option<&Path>) -> anyhow::Result<CliProcessor> {
    let config = CoreConfigBuilder::from_env().build();
    let processor = Processor::new(config, SidecarSpawner, CrateFfprobeExecutor::new());
    if needs_store {
        Ok(processor.with_store(open_store(store_root)?))
    } else {
        Ok(processor)
    }
}

pub fn is_remote(input: &str) -> bool {
    input.starts_with("s3://")
}

/// Loads `input` as a local file/directory or an `s3://bucket/prefix` listing.
pub fn load_input(processor: &mut CliProcessor, input: &str) -> anyhow::Result<Vec<Video>> {
    let videos = if is_remote(input) {
        let Some((bucket, prefix)) = parse_bucket_uri(input) else {
            bail!("'{input}' is not an s3://bucket/prefix location");
        };
        processor
            .load_remote(&bucket, &prefix)
            .with_context(|| format!("Failed to list {input}"))?
    } else {
        processor
            .load_local(Path::new(input))
            .with_context(|| format!("Invalid input path '{input}'"))?
    };
    if videos.is_empty() {
        bail!("No videos found at '{input}'");
    }
    Ok(videos)
}
