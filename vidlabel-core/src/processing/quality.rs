//! Objective quality comparison between a source and a transcoded video.
//!
//! Uses ffmpeg's `psnr` filter and reads the `average:` figure from its
//! summary line. Both videos must have the same frame size; the comparison
//! stops at the end of the shorter one.

use log::info;

use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegSpawner, TranscodeCommand, run_ffmpeg_with_log};
use crate::media::{MediaContext, Video};

/// Pulls the overall PSNR out of a `psnr` filter summary line. `inf` means
/// the inputs are identical.
pub fn parse_psnr_average(line: &str) -> Option<f64> {
    if !line.contains("PSNR") {
        return None;
    }
    let value = line.split_whitespace().find_map(|tok| tok.strip_prefix("average:"))?;
    match value {
        "inf" => Some(f64::INFINITY),
        v => v.parse::<f64>().ok().filter(|p| !p.is_nan()),
    }
}

pub struct QualityMeter<'a, S: FfmpegSpawner> {
    spawner: &'a S,
    ctx: MediaContext<'a>,
}

impl<'a, S: FfmpegSpawner> QualityMeter<'a, S> {
    pub fn new(spawner: &'a S, ctx: MediaContext<'a>) -> Self {
        Self { spawner, ctx }
    }

    pub fn command_for(&self, reference: &Video, distorted: &Video) -> CoreResult<TranscodeCommand> {
        let distorted_input = self.ctx.locate(distorted)?;
        let reference_input = self.ctx.locate(reference)?;
        Ok(TranscodeCommand::builder(distorted_input, "-")
            .with_overwrite(false)
            .args(["-i".to_string(), reference_input])
            .args(["-lavfi", "[0:v][1:v]psnr=shortest=1", "-f", "null"])
            .build())
    }

    /// Average PSNR in dB of `distorted` against `reference`.
    pub fn psnr(&self, reference: &Video, distorted: &Video) -> CoreResult<f64> {
        let cmd = self.command_for(reference, distorted)?;
        let lines = run_ffmpeg_with_log(self.spawner, &cmd)?;
        let psnr = lines
            .iter()
            .rev()
            .find_map(|line| parse_psnr_average(line))
            .ok_or_else(|| CoreError::MissingPsnr(cmd.to_string()))?;
        info!(
            "PSNR of {} against {}: {:.2} dB",
            distorted.display_name(),
            reference.display_name(),
            psnr
        );
        Ok(psnr)
    }
}
