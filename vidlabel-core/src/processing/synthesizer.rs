// ============================================================================
// vidlabel-core/src/processing/synthesizer.rs
// ============================================================================
//
// COMMAND SYNTHESIS AND EXECUTION
//
// Turns a video's pending labels into exactly one ffmpeg invocation:
//
//     -y -hide_banner -i <input> <flags...> [-filter_complex a,b,c] <dir>/<output_title>
//
// Flags keep accumulation order and are never de-duplicated; ffmpeg applies
// the last occurrence of a repeated option. Filter fragments are joined with
// `,` into one graph. A segmenting label numbers its outputs `<stem>_%03d.<ext>`.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegSpawner, VideoFilterChain, run_ffmpeg};
use crate::media::{MediaContext, Video};

pub use crate::external::TranscodeCommand;

/// Output file name for `video`, with the segment counter inserted when the
/// flush fans out into clips.
pub fn output_file_name(video: &Video) -> String {
    let title = video.output_title();
    if !video.pending().is_segmenting() {
        return title;
    }
    let path = Path::new(&title);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| title.clone());
    match path.extension() {
        Some(ext) => format!("{stem}_%03d.{}", ext.to_string_lossy()),
        None => format!("{stem}_%03d"),
    }
}

/// Builds the command for `video` reading from `input` and writing into
/// `output_dir`.
///
/// Refuses an output path equal to the video's own local path.
pub fn synthesize(
    video: &Video,
    input: &str,
    output_dir: &Path,
    overwrite: bool,
) -> CoreResult<TranscodeCommand> {
    let output = output_dir.join(output_file_name(video));

    let same_as_input = match video.local_path() {
        Some(source) => {
            source == output
                || match (source.canonicalize(), output.canonicalize()) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                }
        }
        None => false,
    };
    if same_as_input {
        return Err(CoreError::PathError(format!(
            "output {} would overwrite its own input; label the video or flush to another directory",
            output.display()
        )));
    }

    let pending = video.pending();
    let filters = pending
        .filters
        .iter()
        .fold(VideoFilterChain::new(), |chain, f| chain.add_filter(f.expr.clone()));

    Ok(TranscodeCommand::builder(input, output)
        .with_overwrite(overwrite)
        .args(pending.simple_flags.iter().flat_map(|f| f.args.iter().cloned()))
        .filter_graph(filters)
        .build())
}

/// Numbered outputs `<stem>_NNN.<ext>` of a segmenting command, sorted.
fn discover_segments(pattern: &Path) -> CoreResult<Vec<PathBuf>> {
    let file_name = pattern
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (prefix, suffix) = file_name.split_once("%03d").unwrap_or((file_name.as_str(), ""));
    let dir = pattern.parent().unwrap_or_else(|| Path::new("."));

    let mut segments: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let name = path.file_name()?.to_str()?.to_string();
            let counter = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
            let numbered = counter.len() >= 3 && counter.chars().all(|c| c.is_ascii_digit());
            (numbered && path.is_file()).then_some(path)
        })
        .collect();
    segments.sort();
    Ok(segments)
}

/// Runs the flush of single videos.
pub struct Synthesizer<'a, S: FfmpegSpawner> {
    spawner: &'a S,
    ctx: MediaContext<'a>,
    overwrite: bool,
}

impl<'a, S: FfmpegSpawner> Synthesizer<'a, S> {
    pub fn new(spawner: &'a S, ctx: MediaContext<'a>) -> Self {
        Self {
            spawner,
            ctx,
            overwrite: true,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Command that `execute` would run, without running it.
    pub fn command_for(&self, video: &Video, output_dir: &Path) -> CoreResult<TranscodeCommand> {
        let input = self.ctx.locate(video)?;
        synthesize(video, &input, output_dir, self.overwrite)
    }

    /// Clips left in the output directory by an earlier segmenting flush of
    /// the same labels would be reported as outputs of this one. They are
    /// removed when overwriting; otherwise the flush is refused.
    fn clear_stale_segments(&self, pattern: &Path) -> CoreResult<()> {
        let stale = discover_segments(pattern)?;
        if stale.is_empty() {
            return Ok(());
        }
        if !self.overwrite {
            return Err(CoreError::PathError(format!(
                "{} clip(s) matching {} already exist and overwrite is disabled",
                stale.len(),
                pattern.display()
            )));
        }
        warn!(
            "Removing {} existing clip(s) matching {}",
            stale.len(),
            pattern.display()
        );
        for path in stale {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Runs the transcoder for `video` and returns the produced videos.
    ///
    /// On success the source's pending labels are cleared and its resolved
    /// output recorded. On failure the source is left untouched.
    pub fn execute(&self, video: &mut Video, output_dir: &Path) -> CoreResult<Vec<Video>> {
        let cmd = self.command_for(video, output_dir)?;
        info!("Flushing {} -> {}", video.display_name(), cmd.output().display());
        if video.pending().is_segmenting() {
            self.clear_stale_segments(cmd.output())?;
        }
        run_ffmpeg(self.spawner, &cmd)?;

        let outputs = if video.pending().is_segmenting() {
            let segments = discover_segments(cmd.output())?;
            if segments.is_empty() {
                warn!("Segmenting {} produced no clips", video.display_name());
            }
            segments
        } else {
            vec![cmd.output().to_path_buf()]
        };

        let produced = outputs
            .iter()
            .map(Video::local)
            .collect::<CoreResult<Vec<_>>>()?;

        video.set_resolved_output(
            outputs
                .first()
                .cloned()
                .unwrap_or_else(|| cmd.output().to_path_buf()),
        );
        video.reset_pending();
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Operation;

    #[test]
    fn test_flags_then_filters_then_output() {
        let mut video = Video::local("/in/a.mp4").unwrap();
        video.add_simple_flag(Operation::TrimWindow, ["-ss", "1", "-t", "4"]);
        video.add_filter_fragment(Operation::Crop, "crop=100:100:0:0");
        video.add_filter_fragment(Operation::Grayscale, "format=gray");
        video.add_name_fragment(Operation::TrimWindow, "trimmed_1_to_5");
        video.add_name_fragment(Operation::Crop, "cropped_100x100");
        video.add_name_fragment(Operation::Grayscale, "greyscale");

        let cmd = synthesize(&video, "/in/a.mp4", Path::new("/out"), true).unwrap();
        assert_eq!(
            cmd.to_args(),
            vec![
                "-y",
                "-hide_banner",
                "-i",
                "/in/a.mp4",
                "-ss",
                "1",
                "-t",
                "4",
                "-filter_complex",
                "crop=100:100:0:0,format=gray",
                "/out/trimmed_1_to_5_cropped_100x100_greyscale_a.mp4"
            ]
        );
    }

    #[test]
    fn test_repeated_flags_are_kept_in_order() {
        let mut video = Video::local("/in/a.mp4").unwrap();
        video.add_simple_flag(Operation::TrimWindow, ["-ss", "1", "-t", "2"]);
        video.add_simple_flag(Operation::TrimWindow, ["-ss", "3", "-t", "1"]);
        let args = synthesize(&video, "/in/a.mp4", Path::new("/out"), true)
            .unwrap()
            .to_args();
        let ss: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(i, _)| *i > 0 && args[i - 1] == "-ss")
            .map(|(_, a)| a)
            .collect();
        assert_eq!(ss, vec!["1", "3"]);
    }

    #[test]
    fn test_segment_output_name() {
        let mut video = Video::local("/in/a.mp4").unwrap();
        video.add_simple_flag(Operation::Segment, ["-f", "segment"]);
        video.add_name_fragment(Operation::Segment, "trimmed_10_clips");
        assert_eq!(output_file_name(&video), "trimmed_10_clips_a_%03d.mp4");
    }

    #[test]
    fn test_unlabeled_flush_into_source_dir_is_refused() {
        let video = Video::local("/in/a.mp4").unwrap();
        let err = synthesize(&video, "/in/a.mp4", Path::new("/in"), true).unwrap_err();
        assert!(matches!(err, CoreError::PathError(_)));
    }

    #[test]
    fn test_discover_segments_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c_002.mp4", "c_000.mp4", "c_001.mp4", "c_x.mp4", "other_000.mp4"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let found = discover_segments(&dir.path().join("c_%03d.mp4")).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["c_000.mp4", "c_001.mp4", "c_002.mp4"]);
    }
}
