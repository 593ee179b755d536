//! Error types for vidlabel-core.
//!
//! Labeling and flushing record failures per video and keep going; only
//! failures that would hit every video abort a batch.

use crate::storage::StorageError;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors produced by the core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Required dependency '{0}' not found. Please install it and ensure it's in your PATH.")]
    DependencyNotFound(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, std::io::Error),

    #[error("Failed waiting for command '{0}': {1}")]
    CommandWait(String, std::io::Error),

    #[error("Command '{command}' failed with status {status}: {output}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        output: String,
    },

    /// ffprobe could not be run or its report could not be parsed.
    #[error("Probe failed for {source_ref}: {message}")]
    Probe { source_ref: String, message: String },

    /// The probe report has no value for a field an operation needs.
    #[error("Metadata field '{field}' missing for video '{video}'")]
    MetadataFieldMissing { field: &'static str, video: String },

    /// A labeling operation rejected its parameters for one video.
    #[error("{operation}({params}) rejected for video '{video}': {reason}")]
    Validation {
        operation: &'static str,
        params: String,
        video: String,
        reason: String,
    },

    /// The transcoder exited non-zero while flushing one video.
    #[error("Encode failed ({status}) for command `{command}`:\n{output}")]
    Encode {
        command: String,
        status: String,
        output: String,
    },

    #[error("No PSNR summary in the output of `{0}`")]
    MissingPsnr(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid label operation '{0}': {1}")]
    InvalidLabel(String, String),

    #[error("No files found in {0}")]
    NoFilesFound(String),
}

/// Result alias used throughout the crate.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

pub fn command_start_error(command: impl Into<String>, error: std::io::Error) -> CoreError {
    CoreError::CommandStart(command.into(), error)
}

pub fn command_wait_error(command: impl Into<String>, error: std::io::Error) -> CoreError {
    CoreError::CommandWait(command.into(), error)
}

pub fn command_failed_error(
    command: impl Into<String>,
    status: ExitStatus,
    output: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        command: command.into(),
        status,
        output: output.into(),
    }
}

impl CoreError {
    /// Builds a `Validation` error for a labeling operation.
    pub fn validation(
        operation: &'static str,
        params: impl Into<String>,
        video: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CoreError::Validation {
            operation,
            params: params.into(),
            video: video.into(),
            reason: reason.into(),
        }
    }

    /// False for failures that would repeat for every video of a batch
    /// (the transcoder is missing or cannot be started).
    pub fn is_per_video(&self) -> bool {
        !matches!(
            self,
            CoreError::CommandStart(..) | CoreError::DependencyNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_operation_and_video() {
        let err = CoreError::validation("crop", "0,0,1921,1080", "clip.mp4", "exceeds width 1920");
        let msg = err.to_string();
        assert!(msg.contains("crop(0,0,1921,1080)"));
        assert!(msg.contains("clip.mp4"));
        assert!(msg.contains("exceeds width 1920"));
        assert!(err.is_per_video());
    }

    #[test]
    fn missing_transcoder_is_not_per_video() {
        let err = command_start_error(
            "ffmpeg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert!(!err.is_per_video());
        assert!(!CoreError::DependencyNotFound("ffmpeg".into()).is_per_video());

        let err: CoreError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(err.is_per_video());
    }
}
