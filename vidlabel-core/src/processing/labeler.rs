// ============================================================================
// vidlabel-core/src/processing/labeler.rs
// ============================================================================
//
// LABEL ACCUMULATOR: Deferred Transcoder Directives
//
// Every operation takes the batch by value and hands it back, so calls chain:
//
//     let videos = labeler.crop(videos, 0, 0, 640, 360);
//     let videos = labeler.grayscale(videos);
//
// Nothing runs here. Per video an operation computes its complete label set
// (flags, filter stage, name token) first and only then appends it, so a
// rejected video is left exactly as it was. Rejections are logged and kept in
// the labeler's failure journal; the rest of the batch carries on.

use std::cell::RefCell;
use std::fmt;
use std::str::FromStr;

use log::{debug, error};

use crate::error::{CoreError, CoreResult};
use crate::media::{MediaContext, Operation, Video};
use crate::utils::format_seconds;

// ============================================================================
// RESOLUTIONS
// ============================================================================

/// Named output resolutions accepted by `change_resolution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    P1080,
    P720,
    P480,
    P360,
    P240,
}

impl Resolution {
    /// Target (width, height) in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::P1080 => (1920, 1080),
            Resolution::P720 => (1280, 720),
            Resolution::P480 => (640, 480),
            Resolution::P360 => (480, 360),
            Resolution::P240 => (426, 240),
        }
    }
}

impl FromStr for Resolution {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1080p" => Ok(Resolution::P1080),
            "720p" => Ok(Resolution::P720),
            "480p" => Ok(Resolution::P480),
            "360p" => Ok(Resolution::P360),
            "240p" => Ok(Resolution::P240),
            _ => Err(CoreError::InvalidLabel(
                s.to_string(),
                "resolution must be one of 1080p, 720p, 480p, 360p, 240p".to_string(),
            )),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (_, height) = self.dimensions();
        write!(f, "{height}p")
    }
}

// ============================================================================
// LABEL OPERATIONS AS VALUES
// ============================================================================

/// A labeling operation with its parameters, parsed from `name=a:b:..`.
///
/// | syntax | operation |
/// |---|---|
/// | `resize-ratio=X:Y` | `resize_by_ratio` |
/// | `resolution=720p` | `change_resolution` |
/// | `trim=START:END` | `trim_start_end` |
/// | `segment=SECONDS` | `trim_into_clips` |
/// | `trim-from-frame=N` | `trim_on_frame` |
/// | `trim-frames=START:COUNT` | `trim_num_frames` |
/// | `crop=X:Y:W:H` | `crop` |
/// | `blur=LEVEL:STEPS` | `blur` |
/// | `bitrate=KBPS` | `set_bitrate` (0 = tenth of the source) |
/// | `fps=N` | `change_fps` |
/// | `grayscale` | `grayscale` |
#[derive(Debug, Clone, PartialEq)]
pub enum LabelOp {
    ResizeRatio { x: f64, y: f64 },
    Resolution(Resolution),
    Trim { start: f64, end: f64 },
    Segment { interval: f64 },
    TrimFromFrame { frame: u64 },
    TrimFrames { start: u64, count: u64 },
    Crop { x: u32, y: u32, width: u32, height: u32 },
    Blur { level: u32, steps: u32 },
    Bitrate { kbps: u64 },
    Fps { fps: f64 },
    Grayscale,
}

fn parse_arg<T: FromStr>(spec: &str, value: &str) -> CoreResult<T> {
    value.trim().parse::<T>().map_err(|_| {
        CoreError::InvalidLabel(spec.to_string(), format!("cannot parse argument '{value}'"))
    })
}

fn expect_args<'s>(spec: &str, args: &'s str, count: usize) -> CoreResult<Vec<&'s str>> {
    let parts: Vec<&str> = if args.is_empty() {
        Vec::new()
    } else {
        args.split(':').collect()
    };
    if parts.len() != count {
        return Err(CoreError::InvalidLabel(
            spec.to_string(),
            format!("expected {count} argument(s), got {}", parts.len()),
        ));
    }
    Ok(parts)
}

impl FromStr for LabelOp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        let (name, args) = spec.split_once('=').unwrap_or((spec, ""));

        let op = match name.trim().to_ascii_lowercase().as_str() {
            "resize-ratio" => {
                let a = expect_args(spec, args, 2)?;
                LabelOp::ResizeRatio {
                    x: parse_arg(spec, a[0])?,
                    y: parse_arg(spec, a[1])?,
                }
            }
            "resolution" => {
                let a = expect_args(spec, args, 1)?;
                LabelOp::Resolution(a[0].parse()?)
            }
            "trim" => {
                let a = expect_args(spec, args, 2)?;
                LabelOp::Trim {
                    start: parse_arg(spec, a[0])?,
                    end: parse_arg(spec, a[1])?,
                }
            }
            "segment" => {
                let a = expect_args(spec, args, 1)?;
                LabelOp::Segment {
                    interval: parse_arg(spec, a[0])?,
                }
            }
            "trim-from-frame" => {
                let a = expect_args(spec, args, 1)?;
                LabelOp::TrimFromFrame {
                    frame: parse_arg(spec, a[0])?,
                }
            }
            "trim-frames" => {
                let a = expect_args(spec, args, 2)?;
                LabelOp::TrimFrames {
                    start: parse_arg(spec, a[0])?,
                    count: parse_arg(spec, a[1])?,
                }
            }
            "crop" => {
                let a = expect_args(spec, args, 4)?;
                LabelOp::Crop {
                    x: parse_arg(spec, a[0])?,
                    y: parse_arg(spec, a[1])?,
                    width: parse_arg(spec, a[2])?,
                    height: parse_arg(spec, a[3])?,
                }
            }
            "blur" => {
                let a = expect_args(spec, args, 2)?;
                LabelOp::Blur {
                    level: parse_arg(spec, a[0])?,
                    steps: parse_arg(spec, a[1])?,
                }
            }
            "bitrate" => {
                let a = expect_args(spec, args, 1)?;
                LabelOp::Bitrate {
                    kbps: parse_arg(spec, a[0])?,
                }
            }
            "fps" => {
                let a = expect_args(spec, args, 1)?;
                LabelOp::Fps {
                    fps: parse_arg(spec, a[0])?,
                }
            }
            "grayscale" | "greyscale" => {
                expect_args(spec, args, 0)?;
                LabelOp::Grayscale
            }
            other => {
                return Err(CoreError::InvalidLabel(
                    spec.to_string(),
                    format!("unknown operation '{other}'"),
                ));
            }
        };
        Ok(op)
    }
}

impl fmt::Display for LabelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelOp::ResizeRatio { x, y } => {
                write!(f, "resize-ratio={}:{}", format_seconds(*x), format_seconds(*y))
            }
            LabelOp::Resolution(res) => write!(f, "resolution={res}"),
            LabelOp::Trim { start, end } => {
                write!(f, "trim={}:{}", format_seconds(*start), format_seconds(*end))
            }
            LabelOp::Segment { interval } => write!(f, "segment={}", format_seconds(*interval)),
            LabelOp::TrimFromFrame { frame } => write!(f, "trim-from-frame={frame}"),
            LabelOp::TrimFrames { start, count } => write!(f, "trim-frames={start}:{count}"),
            LabelOp::Crop { x, y, width, height } => write!(f, "crop={x}:{y}:{width}:{height}"),
            LabelOp::Blur { level, steps } => write!(f, "blur={level}:{steps}"),
            LabelOp::Bitrate { kbps } => write!(f, "bitrate={kbps}"),
            LabelOp::Fps { fps } => write!(f, "fps={}", format_seconds(*fps)),
            LabelOp::Grayscale => f.write_str("grayscale"),
        }
    }
}

// ============================================================================
// LABELER
// ============================================================================

/// A rejected labeling request for one video.
#[derive(Debug)]
pub struct LabelFailure {
    pub operation: Operation,
    pub video: String,
    pub error: CoreError,
}

/// Everything one operation appends to one video.
struct LabelSet {
    op: Operation,
    flags: Option<Vec<String>>,
    filter: Option<String>,
    name: String,
}

impl LabelSet {
    fn new(op: Operation, name: impl Into<String>) -> Self {
        Self {
            op,
            flags: None,
            filter: None,
            name: name.into(),
        }
    }

    fn flags<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags = Some(args.into_iter().map(Into::into).collect());
        self
    }

    fn filter(mut self, expr: impl Into<String>) -> Self {
        self.filter = Some(expr.into());
        self
    }

    fn apply_to(self, video: &mut Video) {
        if let Some(flags) = self.flags {
            video.add_simple_flag(self.op, flags);
        }
        if let Some(filter) = self.filter {
            video.add_filter_fragment(self.op, filter);
        }
        video.add_name_fragment(self.op, self.name);
    }
}

/// Rounds a pixel size up to the next even number. `None` when the result
/// does not fit a frame dimension.
pub fn round_up_even(value: u64) -> Option<u32> {
    value
        .checked_add(value % 2)
        .and_then(|v| u32::try_from(v).ok())
}

pub struct Labeler<'a> {
    ctx: MediaContext<'a>,
    retime_audio: bool,
    failures: RefCell<Vec<LabelFailure>>,
}

impl<'a> Labeler<'a> {
    pub fn new(ctx: MediaContext<'a>) -> Self {
        Self {
            ctx,
            retime_audio: false,
            failures: RefCell::new(Vec::new()),
        }
    }

    /// Also resample audio timestamps when `change_fps` is applied.
    pub fn with_retime_audio(mut self, enabled: bool) -> Self {
        self.retime_audio = enabled;
        self
    }

    pub fn failure_count(&self) -> usize {
        self.failures.borrow().len()
    }

    /// Drains the failure journal.
    pub fn take_failures(&self) -> Vec<LabelFailure> {
        std::mem::take(&mut *self.failures.borrow_mut())
    }

    fn label_each<F>(&self, op: Operation, params: &str, mut videos: Vec<Video>, compute: F) -> Vec<Video>
    where
        F: Fn(&Video) -> CoreResult<LabelSet>,
    {
        let mut labeled = 0usize;
        for video in videos.iter_mut() {
            match compute(video) {
                Ok(set) => {
                    set.apply_to(video);
                    labeled += 1;
                }
                Err(err) => {
                    error!("{op}({params}) skipped for {}: {err}", video.display_name());
                    self.failures.borrow_mut().push(LabelFailure {
                        operation: op,
                        video: video.display_name(),
                        error: err,
                    });
                }
            }
        }
        debug!("{op}({params}) labeled {labeled}/{} video(s)", videos.len());
        videos
    }

    fn reject(op: Operation, params: &str, video: &Video, reason: impl Into<String>) -> CoreError {
        CoreError::validation(op.as_str(), params, video.display_name(), reason)
    }

    /// Runs a parsed operation.
    pub fn apply(&self, op: &LabelOp, videos: Vec<Video>) -> Vec<Video> {
        match *op {
            LabelOp::ResizeRatio { x, y } => self.resize_by_ratio(videos, x, y),
            LabelOp::Resolution(res) => self.change_resolution(videos, res),
            LabelOp::Trim { start, end } => self.trim_start_end(videos, start, end),
            LabelOp::Segment { interval } => self.trim_into_clips(videos, interval),
            LabelOp::TrimFromFrame { frame } => self.trim_on_frame(videos, frame),
            LabelOp::TrimFrames { start, count } => self.trim_num_frames(videos, start, count),
            LabelOp::Crop { x, y, width, height } => self.crop(videos, x, y, width, height),
            LabelOp::Blur { level, steps } => self.blur(videos, level, steps),
            LabelOp::Bitrate { kbps } => self.set_bitrate(videos, kbps),
            LabelOp::Fps { fps } => self.change_fps(videos, fps),
            LabelOp::Grayscale => self.grayscale(videos),
        }
    }

    // ---- Geometry ----

    /// Scales width and height by the given ratios. Each result is floored,
    /// then rounded up to an even number.
    pub fn resize_by_ratio(&self, videos: Vec<Video>, x_ratio: f64, y_ratio: f64) -> Vec<Video> {
        let op = Operation::ResizeRatio;
        let params = format!("{}, {}", format_seconds(x_ratio), format_seconds(y_ratio));
        self.label_each(op, &params, videos, |video| {
            let valid = |r: f64| r.is_finite() && r > 0.0;
            if !valid(x_ratio) || !valid(y_ratio) {
                return Err(Self::reject(op, &params, video, "ratios must be positive"));
            }
            let width = video.width(&self.ctx)?;
            let height = video.height(&self.ctx)?;
            let (Some(new_width), Some(new_height)) = (
                round_up_even((f64::from(width) * x_ratio).floor() as u64),
                round_up_even((f64::from(height) * y_ratio).floor() as u64),
            ) else {
                return Err(Self::reject(
                    op,
                    &params,
                    video,
                    format!("{width}x{height} scales beyond the maximum frame size"),
                ));
            };
            if new_width == 0 || new_height == 0 {
                return Err(Self::reject(
                    op,
                    &params,
                    video,
                    format!("{width}x{height} scales to zero size"),
                ));
            }
            Ok(LabelSet::new(
                op,
                format!(
                    "resized_ratio_{}_{}",
                    format_seconds(x_ratio),
                    format_seconds(y_ratio)
                ),
            )
            .filter(format!("scale={new_width}:{new_height},setsar=1:1")))
        })
    }

    /// Re-encodes at a standard resolution with libx264.
    pub fn change_resolution(&self, videos: Vec<Video>, resolution: Resolution) -> Vec<Video> {
        let op = Operation::Resolution;
        let (width, height) = resolution.dimensions();
        self.label_each(op, &resolution.to_string(), videos, |_| {
            Ok(LabelSet::new(op, format!("resized_{width}x{height}"))
                .flags(["-c:v", "libx264", "-preset", "slow", "-crf", "28"])
                .filter(format!("scale={width}:{height}:flags=lanczos")))
        })
    }

    /// Crops a `width`x`height` window whose top-left corner is (`x`, `y`).
    pub fn crop(&self, videos: Vec<Video>, x: u32, y: u32, width: u32, height: u32) -> Vec<Video> {
        let op = Operation::Crop;
        let params = format!("{x}, {y}, {width}, {height}");
        self.label_each(op, &params, videos, |video| {
            if width == 0 || height == 0 {
                return Err(Self::reject(op, &params, video, "crop size must be non-zero"));
            }
            let source_width = video.width(&self.ctx)?;
            let source_height = video.height(&self.ctx)?;
            if u64::from(x) + u64::from(width) > u64::from(source_width) {
                return Err(Self::reject(
                    op,
                    &params,
                    video,
                    format!("x + width exceeds width {source_width}"),
                ));
            }
            if u64::from(y) + u64::from(height) > u64::from(source_height) {
                return Err(Self::reject(
                    op,
                    &params,
                    video,
                    format!("y + height exceeds height {source_height}"),
                ));
            }
            Ok(LabelSet::new(op, format!("cropped_{width}x{height}"))
                .filter(format!("crop={width}:{height}:{x}:{y}")))
        })
    }

    // ---- Time ----

    /// Keeps `[start, end)`. Only `start` is checked against the duration; an
    /// `end` before `start` is passed to ffmpeg unchanged.
    pub fn trim_start_end(&self, videos: Vec<Video>, start: f64, end: f64) -> Vec<Video> {
        let op = Operation::TrimWindow;
        let (start_s, end_s) = (format_seconds(start), format_seconds(end));
        let params = format!("{start_s}, {end_s}");
        self.label_each(op, &params, videos, |video| {
            if !start.is_finite() || !end.is_finite() {
                return Err(Self::reject(op, &params, video, "times must be finite"));
            }
            let duration = video.duration(&self.ctx)?;
            if start < 0.0 || start >= duration {
                return Err(Self::reject(
                    op,
                    &params,
                    video,
                    format!("start must be in [0, {})", format_seconds(duration)),
                ));
            }
            Ok(LabelSet::new(op, format!("trimmed_{start_s}_to_{end_s}"))
                .flags(["-ss".to_string(), start_s.clone(), "-t".to_string(), format_seconds(end - start)]))
        })
    }

    /// Splits into consecutive clips of `interval` seconds; the last one holds
    /// the remainder. The flush produces one output per clip.
    pub fn trim_into_clips(&self, videos: Vec<Video>, interval: f64) -> Vec<Video> {
        let op = Operation::Segment;
        let interval_s = format_seconds(interval);
        self.label_each(op, &interval_s, videos, |video| {
            if !interval.is_finite() || interval <= 0.0 {
                return Err(Self::reject(op, &interval_s, video, "interval must be positive"));
            }
            Ok(LabelSet::new(op, format!("trimmed_{interval_s}_clips")).flags([
                "-c:a".to_string(),
                "aac".to_string(),
                "-vsync".to_string(),
                "vfr".to_string(),
                "-reset_timestamps".to_string(),
                "1".to_string(),
                "-segment_time".to_string(),
                interval_s.clone(),
                "-g".to_string(),
                interval_s.clone(),
                "-sc_threshold".to_string(),
                "0".to_string(),
                "-force_key_frames".to_string(),
                format!("expr:gte(t,n_forced*{interval_s})"),
                "-f".to_string(),
                "segment".to_string(),
            ]))
        })
    }

    fn frame_rate(&self, op: Operation, params: &str, video: &Video) -> CoreResult<(u64, f64)> {
        let frames = video.frame_count(&self.ctx)?;
        let duration = video.duration(&self.ctx)?;
        if frames == 0 || duration <= 0.0 {
            return Err(Self::reject(op, params, video, "video has no frames"));
        }
        Ok((frames, frames as f64 / duration))
    }

    /// Drops everything before `frame`.
    pub fn trim_on_frame(&self, videos: Vec<Video>, frame: u64) -> Vec<Video> {
        let op = Operation::TrimFromFrame;
        let params = frame.to_string();
        self.label_each(op, &params, videos, |video| {
            let (frames, fps) = self.frame_rate(op, &params, video)?;
            if frame > frames {
                return Err(Self::reject(
                    op,
                    &params,
                    video,
                    format!("frame must be in [0, {frames}]"),
                ));
            }
            let timestamp = frame as f64 / fps;
            Ok(LabelSet::new(op, format!("trimmed_on_frame_{frame}"))
                .flags(["-ss".to_string(), format_seconds(timestamp)]))
        })
    }

    /// Keeps `count` frames starting at frame `start`.
    pub fn trim_num_frames(&self, videos: Vec<Video>, start: u64, count: u64) -> Vec<Video> {
        let op = Operation::TrimFrames;
        let params = format!("{start}, {count}");
        self.label_each(op, &params, videos, |video| {
            let (frames, fps) = self.frame_rate(op, &params, video)?;
            if start == 0 || count == 0 {
                return Err(Self::reject(op, &params, video, "start and count must be positive"));
            }
            let end = start.saturating_add(count);
            if end >= frames {
                return Err(Self::reject(
                    op,
                    &params,
                    video,
                    format!("start + count must stay below {frames} frames"),
                ));
            }
            let timestamp = start as f64 / fps;
            Ok(LabelSet::new(op, format!("trim_frames_{start}_to_{end}")).flags([
                "-ss".to_string(),
                format_seconds(timestamp),
                "-frames:v".to_string(),
                count.to_string(),
            ]))
        })
    }

    // ---- Appearance and encoding ----

    /// Gaussian blur with sigma `level` (0-51) applied `steps` times (1-5).
    pub fn blur(&self, videos: Vec<Video>, level: u32, steps: u32) -> Vec<Video> {
        let op = Operation::Blur;
        let params = format!("{level}, {steps}");
        self.label_each(op, &params, videos, |video| {
            if level > 51 || !(1..=5).contains(&steps) {
                return Err(Self::reject(
                    op,
                    &params,
                    video,
                    "level must be 0-51 and steps 1-5",
                ));
            }
            Ok(LabelSet::new(op, format!("blurred_{level}x{steps}"))
                .filter(format!("gblur=sigma={level}:steps={steps}")))
        })
    }

    /// Constant bitrate in kbit/s. `0` derives the rate from the source:
    /// `ceil(bit_rate / 10000)`.
    pub fn set_bitrate(&self, videos: Vec<Video>, kbps: u64) -> Vec<Video> {
        let op = Operation::Bitrate;
        let params = kbps.to_string();
        self.label_each(op, &params, videos, |video| {
            let rate = if kbps == 0 {
                video.bit_rate(&self.ctx)?.div_ceil(10_000)
            } else {
                kbps
            };
            if rate == 0 {
                return Err(Self::reject(op, &params, video, "source bitrate is zero"));
            }
            let Some(bufsize) = rate.checked_mul(2) else {
                return Err(Self::reject(op, &params, video, "bitrate is too large"));
            };
            let target = format!("{rate}K");
            Ok(LabelSet::new(op, format!("bitrate_{rate}K")).flags([
                "-x264-params".to_string(),
                "nal-hdr=cbr".to_string(),
                "-b:v".to_string(),
                target.clone(),
                "-minrate".to_string(),
                target.clone(),
                "-maxrate".to_string(),
                target,
                "-bufsize".to_string(),
                format!("{bufsize}K"),
            ]))
        })
    }

    pub fn change_fps(&self, videos: Vec<Video>, fps: f64) -> Vec<Video> {
        let op = Operation::FrameRate;
        let fps_s = format_seconds(fps);
        let retime_audio = self.retime_audio;
        self.label_each(op, &fps_s, videos, |video| {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(Self::reject(op, &fps_s, video, "frame rate must be positive"));
            }
            let set = LabelSet::new(op, format!("framerate_{fps_s}")).filter(format!("fps={fps_s}"));
            Ok(if retime_audio {
                set.flags(["-af", "aresample=async=1"])
            } else {
                set
            })
        })
    }

    pub fn grayscale(&self, videos: Vec<Video>) -> Vec<Video> {
        let op = Operation::Grayscale;
        self.label_each(op, "", videos, |_| {
            Ok(LabelSet::new(op, "greyscale").filter("format=gray"))
        })
    }
}
