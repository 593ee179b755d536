//! Implementation of the 'extract' subcommand: still frames as PNG files.

use std::path::Path;

use anyhow::bail;

use crate::cli::ExtractArgs;
use crate::commands::{build_processor, check_tools, is_remote, load_input};
use crate::output::{print_info, print_success};

pub fn run_extract(args: ExtractArgs, store_root: Option<&Path>) -> anyhow::Result<()> {
    check_tools()?;
    let mut processor = build_processor(is_remote(&args.input), store_root)?;
    let videos = load_input(&mut processor, &args.input)?;
    let extractor = processor.extractor();

    let frames = match (args.at_time, args.frame, args.frames) {
        (Some(seconds), _, _) => extractor.frame_at_time(&videos, seconds, &args.output_dir)?,
        (_, Some(index), _) => extractor.frame_at_index(&videos, index, &args.output_dir)?,
        (_, _, Some((start, count))) => extractor.frames_from(&videos, start, count, &args.output_dir)?,
        (None, None, None) => bail!("one of --at-time, --frame or --frames is required"),
    };

    for frame in &frames {
        print_info("Frame", frame.display());
    }
    if frames.is_empty() {
        bail!("No frames were extracted from '{}'", args.input);
    }
    print_success(&format!("Extracted {} frame(s)", frames.len()));
    Ok(())
}
