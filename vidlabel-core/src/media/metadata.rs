//! Probe report reduced to the fields the labeling operations consume.

use serde::{Deserialize, Serialize};

/// Technical properties of a video, taken from its primary stream.
///
/// The primary stream is the first video stream; when a file has none, the
/// first stream of any kind is used so codec and duration are still reported.
/// Every field is optional: operations that need a missing field fail with
/// `CoreError::MetadataFieldMissing` for that video only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<f64>,
    pub frame_count: Option<u64>,
    /// Bits per second.
    pub bit_rate: Option<u64>,
    pub stream_count: usize,
}

fn parse_f64(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn parse_u64(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.parse::<u64>().ok())
}

fn positive_dimension(value: Option<i64>) -> Option<u32> {
    value.filter(|v| *v > 0).and_then(|v| u32::try_from(v).ok())
}

impl VideoMetadata {
    pub fn from_ffprobe(report: &ffprobe::FfProbe) -> Self {
        let primary = report
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .or_else(|| report.streams.first());

        let format_duration = parse_f64(report.format.duration.as_deref());
        let format_bit_rate = parse_u64(report.format.bit_rate.as_deref());

        match primary {
            Some(stream) => Self {
                codec: stream.codec_name.clone(),
                width: positive_dimension(stream.width),
                height: positive_dimension(stream.height),
                duration_secs: parse_f64(stream.duration.as_deref()).or(format_duration),
                frame_count: parse_u64(stream.nb_frames.as_deref()),
                bit_rate: parse_u64(stream.bit_rate.as_deref()).or(format_bit_rate),
                stream_count: report.streams.len(),
            },
            None => Self {
                duration_secs: format_duration,
                bit_rate: format_bit_rate,
                ..Self::default()
            },
        }
    }

    /// Average frames per second, when both frame count and duration are known.
    pub fn frame_rate(&self) -> Option<f64> {
        match (self.frame_count, self.duration_secs) {
            (Some(frames), Some(duration)) if duration > 0.0 => Some(frames as f64 / duration),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rate() {
        let meta = VideoMetadata {
            frame_count: Some(300),
            duration_secs: Some(10.0),
            ..Default::default()
        };
        assert_eq!(meta.frame_rate(), Some(30.0));

        let no_duration = VideoMetadata {
            frame_count: Some(300),
            duration_secs: Some(0.0),
            ..Default::default()
        };
        assert_eq!(no_duration.frame_rate(), None);
    }

    #[test]
    fn test_parsers_reject_garbage() {
        assert_eq!(parse_f64(Some("N/A")), None);
        assert_eq!(parse_f64(Some("-1.0")), None);
        assert_eq!(parse_f64(Some("12.5")), Some(12.5));
        assert_eq!(parse_u64(Some("4500000")), Some(4_500_000));
        assert_eq!(positive_dimension(Some(0)), None);
        assert_eq!(positive_dimension(Some(1920)), Some(1920));
    }

    #[test]
    fn test_serializes_to_json() {
        let meta = VideoMetadata {
            codec: Some("h264".into()),
            width: Some(1920),
            height: Some(1080),
            duration_secs: Some(12.0),
            frame_count: Some(360),
            bit_rate: Some(4_000_000),
            stream_count: 2,
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"codec\":\"h264\""));
        let back: VideoMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
