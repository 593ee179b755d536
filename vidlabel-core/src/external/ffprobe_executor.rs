//! FFprobe integration for reading video metadata.
//!
//! Inputs are passed to ffprobe as given, so presigned URLs work the same way
//! as local paths.

use crate::error::{CoreError, CoreResult};
use crate::media::VideoMetadata;
use ffprobe::{FfProbeError, ffprobe};

/// Trait for anything that can turn an input reference into `VideoMetadata`.
pub trait FfprobeExecutor {
    /// Probes `input` (local path or URL).
    fn probe(&self, input: &str) -> CoreResult<VideoMetadata>;
}

/// `FfprobeExecutor` backed by the `ffprobe` crate.
#[derive(Debug, Clone, Default)]
pub struct CrateFfprobeExecutor;

impl CrateFfprobeExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl FfprobeExecutor for CrateFfprobeExecutor {
    fn probe(&self, input: &str) -> CoreResult<VideoMetadata> {
        log::debug!("Running ffprobe (via crate) on: {input}");
        match ffprobe(input) {
            Ok(report) => {
                let metadata = VideoMetadata::from_ffprobe(&report);
                if metadata.width.is_none() {
                    log::warn!("No video stream dimensions reported for {input}");
                }
                Ok(metadata)
            }
            Err(err) => {
                log::error!("ffprobe failed on {input}: {err:?}");
                Err(map_ffprobe_error(err, input))
            }
        }
    }
}

fn map_ffprobe_error(err: FfProbeError, input: &str) -> CoreError {
    let message = match err {
        FfProbeError::Io(io_err) => format!("could not run ffprobe: {io_err}"),
        FfProbeError::Status(output) => format!(
            "ffprobe exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        FfProbeError::Deserialize(err) => format!("unreadable ffprobe report: {err}"),
        other => format!("unknown ffprobe error: {other:?}"),
    };
    CoreError::Probe {
        source_ref: input.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_maps_to_probe_error() {
        let err = map_ffprobe_error(
            FfProbeError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "no ffprobe")),
            "/v/a.mp4",
        );
        match err {
            CoreError::Probe { source_ref, message } => {
                assert_eq!(source_ref, "/v/a.mp4");
                assert!(message.contains("no ffprobe"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
