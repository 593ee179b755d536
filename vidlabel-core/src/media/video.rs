// ============================================================================
// vidlabel-core/src/media/video.rs
// ============================================================================
//
// VIDEO ENTITY: Identity, Cached Metadata, Pending Labels
//
// A `Video` is one source file (local path or bucket/key) plus the directives
// accumulated against it since the last flush. Directives live in three
// ordered accumulators and every fragment carries the `Operation` that added
// it, so the synthesizer never has to inspect argument text.
//
// Metadata is probed on first access and cached in a write-once cell.

use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::unsync::OnceCell;

use crate::error::{CoreError, CoreResult};
use crate::media::context::MediaContext;
use crate::media::metadata::VideoMetadata;
use crate::utils::get_filename_safe;

/// Where the authoritative copy of a video lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Local(PathBuf),
    Remote { bucket: String, key: String },
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::Local(path) => write!(f, "{}", path.display()),
            MediaSource::Remote { bucket, key } => write!(f, "s3://{bucket}/{key}"),
        }
    }
}

/// Labeling operation that produced a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ResizeRatio,
    Resolution,
    TrimWindow,
    Segment,
    TrimFromFrame,
    TrimFrames,
    Crop,
    Blur,
    Bitrate,
    FrameRate,
    Grayscale,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ResizeRatio => "resize_by_ratio",
            Operation::Resolution => "change_resolution",
            Operation::TrimWindow => "trim_start_end",
            Operation::Segment => "trim_into_clips",
            Operation::TrimFromFrame => "trim_on_frame",
            Operation::TrimFrames => "trim_num_frames",
            Operation::Crop => "crop",
            Operation::Blur => "blur",
            Operation::Bitrate => "set_bitrate",
            Operation::FrameRate => "change_fps",
            Operation::Grayscale => "grayscale",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transcoder argument tokens added by one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagFragment {
    pub op: Operation,
    pub args: Vec<String>,
}

/// One filter-graph stage (may itself contain `,`-joined stages).
#[derive(Debug, Clone, PartialEq)]
pub struct FilterFragment {
    pub op: Operation,
    pub expr: String,
}

/// Output-name token added by one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct NameFragment {
    pub op: Operation,
    pub token: String,
}

/// Directives accumulated since the last flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingLabels {
    pub simple_flags: Vec<FlagFragment>,
    pub filters: Vec<FilterFragment>,
    pub names: Vec<NameFragment>,
}

impl PendingLabels {
    pub fn is_empty(&self) -> bool {
        self.simple_flags.is_empty() && self.filters.is_empty() && self.names.is_empty()
    }

    /// True when a segmenting operation is pending, so the flush produces
    /// several numbered outputs.
    pub fn is_segmenting(&self) -> bool {
        self.simple_flags.iter().any(|f| f.op == Operation::Segment)
    }
}

#[derive(Debug, Clone)]
pub struct Video {
    source: MediaSource,
    title: String,
    metadata: OnceCell<VideoMetadata>,
    pending: PendingLabels,
    resolved_output: Option<PathBuf>,
}

impl Video {
    /// Video backed by a local file. The title is the file name.
    pub fn local(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        let title = get_filename_safe(&path)?;
        Ok(Self::with_source(MediaSource::Local(path), title))
    }

    /// Video backed by `bucket/key`. The title is the key with the `prefix`
    /// directory removed; any remaining `/` separators are flattened to `_`
    /// so outputs land directly in the staging directory.
    ///
    /// The prefix is matched on whole path segments: `raw` strips `raw/a.mp4`
    /// to `a.mp4` but leaves `rawfoo/a.mp4` as `rawfoo_a.mp4`.
    pub fn remote(
        bucket: impl Into<String>,
        key: impl Into<String>,
        prefix: &str,
    ) -> CoreResult<Self> {
        let key = key.into();
        let dir_prefix = match prefix {
            "" => String::new(),
            p if p.ends_with('/') => p.to_string(),
            p => format!("{p}/"),
        };
        let stripped = key.strip_prefix(dir_prefix.as_str()).unwrap_or(&key);
        let title = stripped.trim_start_matches('/').replace('/', "_");
        if title.is_empty() {
            return Err(CoreError::PathError(format!(
                "object key '{key}' has no title after removing prefix '{prefix}'"
            )));
        }
        Ok(Self::with_source(
            MediaSource::Remote {
                bucket: bucket.into(),
                key,
            },
            title,
        ))
    }

    fn with_source(source: MediaSource, title: String) -> Self {
        Self {
            source,
            title,
            metadata: OnceCell::new(),
            pending: PendingLabels::default(),
            resolved_output: None,
        }
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn local_path(&self) -> Option<&Path> {
        match &self.source {
            MediaSource::Local(path) => Some(path),
            MediaSource::Remote { .. } => None,
        }
    }

    /// Human-readable identity used in logs and errors.
    pub fn display_name(&self) -> String {
        self.source.to_string()
    }

    pub fn pending(&self) -> &PendingLabels {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Primary output written by the last flush of this video.
    pub fn resolved_output(&self) -> Option<&Path> {
        self.resolved_output.as_deref()
    }

    pub(crate) fn set_resolved_output(&mut self, path: PathBuf) {
        self.resolved_output = Some(path);
    }

    // ---- Metadata ----

    /// Cached metadata, probing the source on first access.
    ///
    /// A failed probe leaves the cache empty; it is not retried automatically
    /// within the failing call.
    pub fn metadata(&self, ctx: &MediaContext<'_>) -> CoreResult<&VideoMetadata> {
        self.metadata.get_or_try_init(|| {
            let input = ctx.locate(self)?;
            log::debug!("Probing {}", self.display_name());
            ctx.probe.probe(&input)
        })
    }

    /// Metadata if it has already been fetched.
    pub fn cached_metadata(&self) -> Option<&VideoMetadata> {
        self.metadata.get()
    }

    fn missing(&self, field: &'static str) -> CoreError {
        CoreError::MetadataFieldMissing {
            field,
            video: self.display_name(),
        }
    }

    pub fn width(&self, ctx: &MediaContext<'_>) -> CoreResult<u32> {
        self.metadata(ctx)?.width.ok_or_else(|| self.missing("width"))
    }

    pub fn height(&self, ctx: &MediaContext<'_>) -> CoreResult<u32> {
        self.metadata(ctx)?.height.ok_or_else(|| self.missing("height"))
    }

    pub fn duration(&self, ctx: &MediaContext<'_>) -> CoreResult<f64> {
        self.metadata(ctx)?
            .duration_secs
            .ok_or_else(|| self.missing("duration"))
    }

    pub fn frame_count(&self, ctx: &MediaContext<'_>) -> CoreResult<u64> {
        self.metadata(ctx)?
            .frame_count
            .ok_or_else(|| self.missing("frame_count"))
    }

    pub fn codec(&self, ctx: &MediaContext<'_>) -> CoreResult<String> {
        self.metadata(ctx)?
            .codec
            .clone()
            .ok_or_else(|| self.missing("codec"))
    }

    pub fn bit_rate(&self, ctx: &MediaContext<'_>) -> CoreResult<u64> {
        self.metadata(ctx)?
            .bit_rate
            .ok_or_else(|| self.missing("bit_rate"))
    }

    // ---- Pending labels ----

    pub fn add_simple_flag<I, S>(&mut self, op: Operation, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.simple_flags.push(FlagFragment {
            op,
            args: args.into_iter().map(Into::into).collect(),
        });
    }

    pub fn add_filter_fragment(&mut self, op: Operation, expr: impl Into<String>) {
        self.pending.filters.push(FilterFragment {
            op,
            expr: expr.into(),
        });
    }

    pub fn add_name_fragment(&mut self, op: Operation, token: impl Into<String>) {
        self.pending.names.push(NameFragment {
            op,
            token: token.into(),
        });
    }

    /// Output file name: each name token followed by `_`, then the title.
    pub fn output_title(&self) -> String {
        let mut name: String = self
            .pending
            .names
            .iter()
            .map(|n| format!("{}_", n.token))
            .collect();
        name.push_str(&self.title);
        name
    }

    pub fn reset_pending(&mut self) {
        self.pending = PendingLabels::default();
    }
}
