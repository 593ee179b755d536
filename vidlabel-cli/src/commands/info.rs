//! Implementation of the 'info' subcommand: probe and print metadata.

use anyhow::Context;
use log::warn;
use serde_json::json;

use crate::cli::InfoArgs;
use crate::commands::{build_processor, check_tools, is_remote, load_input};
use crate::output::{print_heading, print_info, print_warning};
use vidlabel_core::{VideoMetadata, format_bytes, format_duration};

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

fn print_metadata(title: &str, source: &str, meta: &VideoMetadata) {
    print_heading(title);
    print_info("Source", source);
    print_info("Codec", or_unknown(meta.codec.as_deref()));
    match (meta.width, meta.height) {
        (Some(w), Some(h)) => print_info("Resolution", format!("{w}x{h}")),
        _ => print_info("Resolution", "unknown"),
    }
    print_info("Duration", or_unknown(meta.duration_secs.map(format_duration)));
    print_info("Frames", or_unknown(meta.frame_count));
    print_info(
        "Frame rate",
        or_unknown(meta.frame_rate().map(|fps| format!("{fps:.3}"))),
    );
    print_info(
        "Bit rate",
        or_unknown(meta.bit_rate.map(|b| format!("{}/s", format_bytes(b / 8)))),
    );
    print_info("Streams", meta.stream_count);
}

pub fn run_info(args: InfoArgs, store_root: Option<&std::path::Path>) -> anyhow::Result<()> {
    check_tools()?;
    let needs_store = args.inputs.iter().any(|i| is_remote(i));
    let mut processor = build_processor(needs_store, store_root)?;

    let mut videos = Vec::new();
    for input in &args.inputs {
        videos.extend(load_input(&mut processor, input)?);
    }

    let ctx = processor.media_context();
    let mut report = Vec::with_capacity(videos.len());
    let mut failed = 0usize;
    for video in &videos {
        match video.metadata(&ctx) {
            Ok(meta) => {
                if args.json {
                    report.push(json!({
                        "source": video.display_name(),
                        "title": video.title(),
                        "metadata": meta,
                    }));
                } else {
                    print_metadata(video.title(), &video.display_name(), meta);
                }
            }
            Err(e) => {
                failed += 1;
                warn!("Could not probe {}: {e}", video.display_name());
                if !args.json {
                    print_warning(&format!("{}: {e}", video.display_name()));
                }
            }
        }
    }

    if args.json {
        let text = serde_json::to_string_pretty(&report).context("Failed to serialize metadata")?;
        println!("{text}");
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} video(s) could not be probed", videos.len());
    }
    Ok(())
}
