//! FFmpeg command builder utilities
//!
//! Commands are kept as structured values until the moment they are spawned,
//! so argument order is fixed in one place and no shell is ever involved:
//!
//! `[-y] [-hide_banner] <pre-input args> -i <input> <args> [-filter_complex <graph>] <output>`

use std::fmt;
use std::path::{Path, PathBuf};

use ffmpeg_sidecar::command::FfmpegCommand;

/// A fully specified ffmpeg invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeCommand {
    overwrite: bool,
    hide_banner: bool,
    pre_input: Vec<String>,
    input: String,
    args: Vec<String>,
    filter_graph: Option<String>,
    output: PathBuf,
}

impl TranscodeCommand {
    pub fn builder(input: impl Into<String>, output: impl Into<PathBuf>) -> TranscodeCommandBuilder {
        TranscodeCommandBuilder::new(input, output)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn filter_graph(&self) -> Option<&str> {
        self.filter_graph.as_deref()
    }

    /// Argument vector passed to the ffmpeg binary.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(8 + self.pre_input.len() + self.args.len());
        if self.overwrite {
            args.push("-y".to_string());
        }
        if self.hide_banner {
            args.push("-hide_banner".to_string());
        }
        args.extend(self.pre_input.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.clone());
        args.extend(self.args.iter().cloned());
        if let Some(graph) = &self.filter_graph {
            args.push("-filter_complex".to_string());
            args.push(graph.clone());
        }
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    pub fn to_ffmpeg_command(&self) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new();
        cmd.args(self.to_args());
        cmd
    }
}

impl fmt::Display for TranscodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ffmpeg {}", self.to_args().join(" "))
    }
}

/// Builder for `TranscodeCommand`.
pub struct TranscodeCommandBuilder {
    cmd: TranscodeCommand,
}

impl TranscodeCommandBuilder {
    #[must_use]
    pub fn new(input: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            cmd: TranscodeCommand {
                overwrite: true,
                hide_banner: true,
                pre_input: Vec::new(),
                input: input.into(),
                args: Vec::new(),
                filter_graph: None,
                output: output.into(),
            },
        }
    }

    /// Sets whether `-y` is passed so existing outputs are replaced
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.cmd.overwrite = overwrite;
        self
    }

    /// Sets whether to hide the `FFmpeg` banner
    #[must_use]
    pub fn with_hide_banner(mut self, hide: bool) -> Self {
        self.cmd.hide_banner = hide;
        self
    }

    /// Arguments placed before `-i` (input seeking).
    #[must_use]
    pub fn pre_input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd.pre_input.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn filter_graph(mut self, chain: VideoFilterChain) -> Self {
        self.cmd.filter_graph = chain.build();
        self
    }

    #[must_use]
    pub fn build(self) -> TranscodeCommand {
        self.cmd
    }
}

/// Builder for constructing video filter chains
#[derive(Default)]
pub struct VideoFilterChain {
    filters: Vec<String>,
}

impl VideoFilterChain {
    /// Creates a new empty filter chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter stage to the chain; empty stages are skipped
    #[must_use]
    pub fn add_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            self.filters.push(filter);
        }
        self
    }

    /// Builds the filter chain into a single filter string
    #[must_use]
    pub fn build(self) -> Option<String> {
        if self.filters.is_empty() {
            None
        } else {
            Some(self.filters.join(","))
        }
    }
}
