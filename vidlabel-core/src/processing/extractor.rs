//! Still-frame extraction.
//!
//! Unlike labeling, extraction runs immediately: one ffmpeg call per video,
//! writing PNGs into the given directory. Labels still pending on a video are
//! not applied to the extracted frames.

use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegSpawner, TranscodeCommand, run_ffmpeg};
use crate::media::{MediaContext, Video};
use crate::utils::format_seconds;

fn stem_of(video: &Video) -> String {
    Path::new(video.title())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| video.title().to_string())
}

pub struct Extractor<'a, S: FfmpegSpawner> {
    spawner: &'a S,
    ctx: MediaContext<'a>,
    overwrite: bool,
}

impl<'a, S: FfmpegSpawner> Extractor<'a, S> {
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

    fn for_each<F>(&self, what: &str, videos: &[Video], output_dir: &Path, extract: F) -> CoreResult<Vec<PathBuf>>
    where
        F: Fn(&Video, &str) -> CoreResult<Vec<PathBuf>>,
    {
        std::fs::create_dir_all(output_dir)?;
        let mut written = Vec::new();
        for video in videos {
            if video.has_pending() {
                warn!(
                    "{} has pending labels; they are not applied to extracted frames",
                    video.display_name()
                );
            }
            let result = self
                .ctx
                .locate(video)
                .and_then(|input| extract(video, &input));
            match result {
                Ok(paths) => written.extend(paths),
                Err(err) => error!("{what} failed for {}: {err}", video.display_name()),
            }
        }
        info!("{what}: wrote {} frame(s) to {}", written.len(), output_dir.display());
        Ok(written)
    }

    /// One frame at `seconds`, which must lie within the video's duration.
    pub fn frame_at_time(&self, videos: &[Video], seconds: f64, output_dir: &Path) -> CoreResult<Vec<PathBuf>> {
        let time = format_seconds(seconds);
        self.for_each("frame_at_time", videos, output_dir, |video, input| {
            let duration = video.duration(&self.ctx)?;
            if !seconds.is_finite() || seconds < 0.0 || seconds > duration {
                return Err(CoreError::validation(
                    "frame_at_time",
                    time.clone(),
                    video.display_name(),
                    format!("time must be in [0, {}]", format_seconds(duration)),
                ));
            }
            let output = output_dir.join(format!(
                "output_extract_frame_at_time_{time}_{}.png",
                stem_of(video)
            ));
            let cmd = TranscodeCommand::builder(input, &output)
                .with_overwrite(self.overwrite)
                .pre_input_args(["-ss".to_string(), time.clone()])
                .args(["-frames:v", "1"])
                .build();
            run_ffmpeg(self.spawner, &cmd)?;
            Ok(vec![output])
        })
    }

    /// The frame with zero-based index `frame`.
    pub fn frame_at_index(&self, videos: &[Video], frame: u64, output_dir: &Path) -> CoreResult<Vec<PathBuf>> {
        self.for_each("frame_at_index", videos, output_dir, |video, input| {
            let frames = video.frame_count(&self.ctx)?;
            if frame >= frames {
                return Err(CoreError::validation(
                    "frame_at_index",
                    frame.to_string(),
                    video.display_name(),
                    format!("frame must be below {frames}"),
                ));
            }
            let output = output_dir.join(format!(
                "output_extract_specific_frame_{frame}_{}.png",
                stem_of(video)
            ));
            let cmd = TranscodeCommand::builder(input, &output)
                .with_overwrite(self.overwrite)
                .args([
                    "-vf".to_string(),
                    format!("select=eq(n\\,{frame})"),
                    "-vsync".to_string(),
                    "0".to_string(),
                    "-frames:v".to_string(),
                    "1".to_string(),
                ])
                .build();
            run_ffmpeg(self.spawner, &cmd)?;
            Ok(vec![output])
        })
    }

    /// `count` consecutive frames starting at index `start`, numbered from 0.
    pub fn frames_from(
        &self,
        videos: &[Video],
        start: u64,
        count: u64,
        output_dir: &Path,
    ) -> CoreResult<Vec<PathBuf>> {
        self.for_each("frames_from", videos, output_dir, |video, input| {
            let frames = video.frame_count(&self.ctx)?;
            let end = start.saturating_add(count);
            if count == 0 || end > frames {
                return Err(CoreError::validation(
                    "frames_from",
                    format!("{start}, {count}"),
                    video.display_name(),
                    format!("need 1..={} frames from {start}", frames.saturating_sub(start)),
                ));
            }
            let prefix = format!("output_extract_many_frames_{start}_{count}_{}", stem_of(video));
            let pattern = output_dir.join(format!("{prefix}_%d.png"));
            let cmd = TranscodeCommand::builder(input, &pattern)
                .with_overwrite(self.overwrite)
                .args([
                    "-vf".to_string(),
                    format!("select=between(n\\,{start}\\,{})", end - 1),
                    "-vsync".to_string(),
                    "0".to_string(),
                    "-frames:v".to_string(),
                    count.to_string(),
                    "-start_number".to_string(),
                    "0".to_string(),
                ])
                .build();
            run_ffmpeg(self.spawner, &cmd)?;
            Ok((0..count)
                .map(|i| output_dir.join(format!("{prefix}_{i}.png")))
                .filter(|p| p.is_file())
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mocks::{MockFfmpegSpawner, MockFfprobeExecutor};
    use crate::media::VideoMetadata;

    fn probe() -> MockFfprobeExecutor {
        MockFfprobeExecutor::with_default(VideoMetadata {
            width: Some(640),
            height: Some(360),
            duration_secs: Some(4.0),
            frame_count: Some(100),
            ..Default::default()
        })
    }

    #[test]
    fn test_frame_at_time_command_and_name() {
        let out = tempfile::tempdir().unwrap();
        let spawner = MockFfmpegSpawner::new();
        let probe = probe();
        let extractor = Extractor::new(&spawner, MediaContext::new(&probe));
        let videos = vec![Video::local("/in/clip.mp4").unwrap()];

        let written = extractor.frame_at_time(&videos, 1.5, out.path()).unwrap();
        assert_eq!(
            written,
            vec![out.path().join("output_extract_frame_at_time_1.5_clip.png")]
        );
        let call = &spawner.get_received_calls()[0];
        assert_eq!(&call[2..6], &["-ss", "1.5", "-i", "/in/clip.mp4"]);
    }

    #[test]
    fn test_out_of_range_requests_are_skipped() {
        let out = tempfile::tempdir().unwrap();
        let spawner = MockFfmpegSpawner::strict();
        let probe = probe();
        let extractor = Extractor::new(&spawner, MediaContext::new(&probe));
        let videos = vec![Video::local("/in/clip.mp4").unwrap()];

        assert!(extractor.frame_at_time(&videos, 5.0, out.path()).unwrap().is_empty());
        assert!(extractor.frame_at_index(&videos, 100, out.path()).unwrap().is_empty());
        assert!(extractor.frames_from(&videos, 90, 20, out.path()).unwrap().is_empty());
        assert!(spawner.get_received_calls().is_empty());
    }

    #[test]
    fn test_frames_from_collects_numbered_outputs() {
        let out = tempfile::tempdir().unwrap();
        let spawner = MockFfmpegSpawner::new();
        spawner.add_success_expectation("select=between", Vec::new(), 3);
        let probe = probe();
        let extractor = Extractor::new(&spawner, MediaContext::new(&probe));
        let videos = vec![Video::local("/in/clip.mp4").unwrap()];

        let written = extractor.frames_from(&videos, 10, 3, out.path()).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written[0].ends_with("output_extract_many_frames_10_3_clip_0.png"));
        let call = &spawner.get_received_calls()[0];
        assert!(call.contains(&"select=between(n\\,10\\,12)".to_string()));
    }
}
