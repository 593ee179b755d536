// ============================================================================
// vidlabel-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// Traits for spawning ffmpeg and consuming its events, the ffmpeg-sidecar
// implementation, and `run_ffmpeg`, which runs one command to completion and
// turns a non-zero exit into `CoreError::Encode` carrying ffmpeg's stderr.

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error, command_wait_error};
use crate::external::ffmpeg_builder::TranscodeCommand;
use ffmpeg_sidecar::child::FfmpegChild as SidecarChild;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::process::ExitStatus;

// --- FFmpeg Execution Abstraction ---

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess {
    /// Processes events from the running command using a provided handler closure.
    fn handle_events<F>(&mut self, handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>;

    /// Waits for the command to complete and returns its exit status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// Trait representing something that can spawn an FfmpegProcess.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;
    /// Spawns ffmpeg for the given command.
    fn spawn(&self, cmd: &TranscodeCommand) -> CoreResult<Self::Process>;
}

// --- Concrete Implementation using ffmpeg-sidecar ---

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
pub struct SidecarProcess(SidecarChild);

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let iterator = self.0.iter().map_err(|e| {
            log::error!("Failed to get ffmpeg event iterator: {}", e);
            command_failed_error(
                "ffmpeg (sidecar - get iter)",
                ExitStatus::default(),
                e.to_string(),
            )
        })?;
        for event in iterator {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0
            .wait()
            .map_err(|e| command_wait_error("ffmpeg (sidecar)", e))
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, cmd: &TranscodeCommand) -> CoreResult<Self::Process> {
        cmd.to_ffmpeg_command()
            .spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error("ffmpeg (sidecar)", e))
    }
}

// --- Synchronous execution ---

/// Runs `cmd` to completion, blocking without a timeout.
///
/// Error and warning output from ffmpeg is collected; on a non-zero exit it is
/// returned verbatim in `CoreError::Encode`.
pub fn run_ffmpeg<S: FfmpegSpawner>(spawner: &S, cmd: &TranscodeCommand) -> CoreResult<()> {
    run_ffmpeg_with_log(spawner, cmd).map(|_| ())
}

/// Like [`run_ffmpeg`], but also returns the info-level log lines ffmpeg
/// printed, which is where filters such as `psnr` report their results.
pub fn run_ffmpeg_with_log<S: FfmpegSpawner>(
    spawner: &S,
    cmd: &TranscodeCommand,
) -> CoreResult<Vec<String>> {
    log::debug!("Running: {cmd}");
    let mut process = spawner.spawn(cmd)?;

    let mut stderr_lines: Vec<String> = Vec::new();
    let mut info_lines: Vec<String> = Vec::new();
    process.handle_events(|event| {
        match event {
            FfmpegEvent::Error(line) => stderr_lines.push(line),
            FfmpegEvent::Log(LogLevel::Fatal | LogLevel::Error, line) => stderr_lines.push(line),
            FfmpegEvent::Log(LogLevel::Warning, line) => {
                log::debug!("ffmpeg: {line}");
                stderr_lines.push(line);
            }
            FfmpegEvent::Log(LogLevel::Info | LogLevel::Unknown, line) => info_lines.push(line),
            _ => {}
        }
        Ok(())
    })?;

    let status = process.wait()?;
    if !status.success() {
        let output = stderr_lines.join("\n");
        log::error!("ffmpeg exited with {status} for {}", cmd.output().display());
        return Err(CoreError::Encode {
            command: cmd.to_string(),
            status: status.to_string(),
            output,
        });
    }
    Ok(info_lines)
}
