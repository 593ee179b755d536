//! Flush results and their summary.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::CoreError;
use crate::media::Video;
use crate::utils::format_duration;

/// A video whose flush failed, with the error that stopped it.
#[derive(Debug)]
pub struct FlushFailure {
    pub video: String,
    pub error: CoreError,
}

/// Everything a flush produced.
#[derive(Debug)]
pub struct FlushOutcome {
    /// New videos, one per produced file, in input order.
    pub videos: Vec<Video>,
    pub failures: Vec<FlushFailure>,
    /// Directory the outputs were written to.
    pub output_dir: PathBuf,
    pub elapsed: Duration,
}

/// Serializable view of a `FlushOutcome`.
#[derive(Debug, Clone, Serialize)]
pub struct FlushSummary {
    pub output_dir: PathBuf,
    pub produced: Vec<PathBuf>,
    pub failed: Vec<String>,
    pub elapsed_secs: f64,
    pub completion_time: DateTime<Local>,
}

impl FlushOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> FlushSummary {
        FlushSummary {
            output_dir: self.output_dir.clone(),
            produced: self
                .videos
                .iter()
                .filter_map(|v| v.local_path().map(|p| p.to_path_buf()))
                .collect(),
            failed: self
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.video, f.error))
                .collect(),
            elapsed_secs: self.elapsed.as_secs_f64(),
            completion_time: Local::now(),
        }
    }

    /// One-line description for logs.
    pub fn describe(&self) -> String {
        format!(
            "{} output(s), {} failure(s) in {} -> {}",
            self.videos.len(),
            self.failures.len(),
            format_duration(self.elapsed.as_secs_f64()),
            self.output_dir.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_outputs_and_failures() {
        let outcome = FlushOutcome {
            videos: vec![Video::local("/out/greyscale_a.mp4").unwrap()],
            failures: vec![FlushFailure {
                video: "/in/b.mp4".into(),
                error: CoreError::Encode {
                    command: "ffmpeg ...".into(),
                    status: "exit status: 1".into(),
                    output: "Invalid data".into(),
                },
            }],
            output_dir: PathBuf::from("/out"),
            elapsed: Duration::from_secs(65),
        };

        assert!(!outcome.is_clean());
        assert_eq!(outcome.describe(), "1 output(s), 1 failure(s) in 00:01:05 -> /out");

        let summary = outcome.summary();
        assert_eq!(summary.produced, vec![PathBuf::from("/out/greyscale_a.mp4")]);
        assert!(summary.failed[0].starts_with("/in/b.mp4: Encode failed"));
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"elapsed_secs\":65.0"));
    }
}
