//! Implementation of the 'run' subcommand.
//!
//! Loads the input, applies every `--op` label in order, then either prints
//! the planned ffmpeg commands (`--dry-run`) or flushes, optionally uploads
//! the outputs and removes the staging directory.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use log::{info, warn};
use owo_colors::OwoColorize;

use crate::cli::RunArgs;
use crate::commands::{build_processor, check_tools, is_remote, load_input};
use crate::output::{print_error, print_heading, print_info, print_success, print_warning, spinner};
use vidlabel_core::format_duration;

pub fn run_run(args: RunArgs, store_root: Option<&Path>) -> anyhow::Result<()> {
    let started = Instant::now();
    if !args.dry_run {
        check_tools()?;
    }

    let needs_store = is_remote(&args.input) || args.upload.is_some();
    let mut processor = build_processor(needs_store, store_root)?;
    let videos = load_input(&mut processor, &args.input)?;
    info!("Labeling {} video(s) with {} operation(s)", videos.len(), args.ops.len());

    let (mut videos, label_failures) = {
        let labeler = processor.labeler();
        let mut videos = videos;
        for op in &args.ops {
            videos = labeler.apply(op, videos);
        }
        (videos, labeler.take_failures())
    };
    for failure in &label_failures {
        print_warning(&format!(
            "{} skipped for {}: {}",
            failure.operation, failure.video, failure.error
        ));
    }

    let output_dir = args.output_dir.as_deref();

    if args.dry_run {
        for cmd in processor.plan(&videos, output_dir)? {
            println!("{cmd}");
        }
        return Ok(());
    }

    let pb = spinner(format!("Flushing {} video(s)", videos.len()));
    let outcome = processor.flush(&mut videos, output_dir);
    pb.finish_and_clear();
    let outcome = outcome.context("Flush aborted")?;

    if args.json {
        let text = serde_json::to_string_pretty(&outcome.summary())
            .context("Failed to serialize flush summary")?;
        println!("{text}");
    } else {
        print_heading("Flush Summary");
        for video in &outcome.videos {
            println!("  {}", video.title().bold());
        }
        print_info("Output directory", outcome.output_dir.display());
        print_info("Elapsed", format_duration(outcome.elapsed.as_secs_f64()));
        for failure in &outcome.failures {
            print_error(&format!("{}: {}", failure.video, failure.error));
        }
    }

    if let Some((bucket, prefix)) = &args.upload {
        let keys = processor
            .upload(&outcome.videos, bucket, prefix)
            .with_context(|| format!("Upload to s3://{bucket}/{prefix} failed"))?;
        print_success(&format!("Uploaded {} file(s) to s3://{bucket}/{prefix}", keys.len()));
    }

    if args.clean {
        processor.cleanup(None)?;
    }

    let failed = label_failures.len() + outcome.failures.len();
    info!("Total run time: {}", format_duration(started.elapsed().as_secs_f64()));
    if failed > 0 {
        warn!("{failed} failure(s) during the run");
        anyhow::bail!("{failed} failure(s) during the run");
    }
    if !args.json {
        print_success(&format!("Produced {} file(s)", outcome.videos.len()));
    }
    Ok(())
}
