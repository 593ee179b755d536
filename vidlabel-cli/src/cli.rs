// vidlabel-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;
use vidlabel_core::LabelOp;
use vidlabel_core::storage::parse_bucket_uri;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "vidlabel: label videos with edits, then flush them through ffmpeg",
    long_about = "Accumulates crop/trim/resize/blur/bitrate/fps/grayscale labels on local or \
                  object-storage videos and executes them as one ffmpeg run per video."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write the log to a timestamped file in this directory
    #[arg(long, global = true, value_name = "DIR", env = "VIDLABEL_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Serve s3:// inputs and uploads from this directory instead of S3
    /// (s3://bucket/key maps to DIR/bucket/key)
    #[arg(long, global = true, value_name = "DIR", env = "VIDLABEL_STORE_ROOT")]
    pub store_root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prints probed metadata for videos
    Info(InfoArgs),
    /// Labels videos with operations and flushes them through ffmpeg
    Run(RunArgs),
    /// Extracts still frames as PNG files
    Extract(ExtractArgs),
    /// Measures the PSNR of a transcoded video against its source
    Compare(CompareArgs),
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Video files, directories or s3://bucket/prefix locations
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input file, directory or s3://bucket/prefix
    #[arg(short = 'i', long = "input", value_name = "INPUT")]
    pub input: String,

    /// Output directory (defaults to VIDLABEL_STAGING_DIR, then the input directory)
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Operation to label, repeatable and applied in order
    /// (e.g. crop=0:0:640:360, resolution=720p, trim=5:20, grayscale)
    #[arg(long = "op", value_name = "OP", required = true)]
    pub ops: Vec<LabelOp>,

    /// Print the ffmpeg commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Upload the outputs to s3://bucket/prefix after flushing
    #[arg(long, value_name = "S3_URI", value_parser = parse_upload_target)]
    pub upload: Option<(String, String)>,

    /// Remove the staging directory after the run
    #[arg(long)]
    pub clean: bool,

    /// Print the flush summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["at_time", "frame", "frames"])
))]
pub struct ExtractArgs {
    /// Input file, directory or s3://bucket/prefix
    #[arg(short = 'i', long = "input", value_name = "INPUT")]
    pub input: String,

    /// Directory the PNG files are written to
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Extract the frame shown at this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub at_time: Option<f64>,

    /// Extract the frame with this index
    #[arg(long, value_name = "INDEX")]
    pub frame: Option<u64>,

    /// Extract COUNT consecutive frames starting at index START
    #[arg(long, value_name = "START:COUNT", value_parser = parse_frame_range)]
    pub frames: Option<(u64, u64)>,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Source video (file or s3://bucket/key)
    #[arg(value_name = "REFERENCE")]
    pub reference: String,

    /// Transcoded video with the same frame size
    #[arg(value_name = "DISTORTED")]
    pub distorted: String,
}

fn parse_upload_target(s: &str) -> Result<(String, String), String> {
    parse_bucket_uri(s).ok_or_else(|| format!("'{s}' is not an s3://bucket/prefix location"))
}

fn parse_frame_range(s: &str) -> Result<(u64, u64), String> {
    let (start, count) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:COUNT, got '{s}'"))?;
    let start = start
        .parse()
        .map_err(|_| format!("invalid start frame '{start}'"))?;
    let count = count
        .parse()
        .map_err(|_| format!("invalid frame count '{count}'"))?;
    Ok((start, count))
}
