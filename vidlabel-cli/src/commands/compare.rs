//! Implementation of the 'compare' subcommand: PSNR of one video against another.

use anyhow::{Context, bail};

use crate::cli::CompareArgs;
use crate::commands::{CliProcessor, build_processor, check_tools, is_remote, load_input};
use crate::output::{print_heading, print_info};
use vidlabel_core::Video;

fn single_video(processor: &mut CliProcessor, input: &str) -> anyhow::Result<Video> {
    let mut videos = load_input(processor, input)?;
    if videos.len() != 1 {
        bail!("'{input}' must name a single video, found {}", videos.len());
    }
    Ok(videos.remove(0))
}

pub fn run_compare(args: CompareArgs, store_root: Option<&std::path::Path>) -> anyhow::Result<()> {
    check_tools()?;
    let needs_store = is_remote(&args.reference) || is_remote(&args.distorted);
    let mut processor = build_processor(needs_store, store_root)?;

    let reference = single_video(&mut processor, &args.reference)?;
    let distorted = single_video(&mut processor, &args.distorted)?;

    let psnr = processor
        .quality()
        .psnr(&reference, &distorted)
        .with_context(|| format!("Failed to compare {} with {}", args.distorted, args.reference))?;

    print_heading("Quality");
    print_info("Reference", reference.display_name());
    print_info("Distorted", distorted.display_name());
    if psnr.is_infinite() {
        print_info("PSNR", "inf (identical)");
    } else {
        print_info("PSNR", format!("{psnr:.2} dB"));
    }
    Ok(())
}
