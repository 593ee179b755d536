// vidlabel-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---
//
// Clones share state through Rc<RefCell<..>>, so a test can hand one clone to
// a Processor and inspect recorded calls through another.

use super::{FfmpegProcess, FfmpegSpawner, FfprobeExecutor, TranscodeCommand};
use crate::error::{CoreError, CoreResult};
use crate::media::VideoMetadata;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::rc::Rc;

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

/// Mock implementation of FfmpegProcess.
#[derive(Clone)]
pub struct MockFfmpegProcess {
    /// Events to emit when handle_events is called.
    pub events_to_emit: Rc<RefCell<Vec<FfmpegEvent>>>,
    /// Exit status to return when wait is called.
    pub exit_status: ExitStatus,
}

impl FfmpegProcess for MockFfmpegProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let events = self.events_to_emit.borrow().clone();
        for event in events {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(self.exit_status)
    }
}

/// Represents an expected ffmpeg command call and its mock result.
pub struct MockFfmpegExpectation {
    pub arg_pattern: String,
    pub result: CoreResult<MockFfmpegProcess>,
    /// Number of output files to create. A `%03d`/`%d` output is expanded to
    /// that many numbered files.
    pub dummy_outputs: usize,
}

/// Mock implementation of FfmpegSpawner supporting multiple expectations.
///
/// Each spawn consumes the first expectation whose pattern appears inside any
/// argument. With no matching expectation the command succeeds and creates
/// its (single) output, unless `strict()` was requested.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Rc<RefCell<Vec<MockFfmpegExpectation>>>,
    received_calls: Rc<RefCell<Vec<Vec<String>>>>,
    strict: bool,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Default::default()
    }

    /// Panics on commands no expectation matches.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }

    pub fn add_expectation(
        &self,
        arg_pattern: &str,
        result: CoreResult<MockFfmpegProcess>,
        dummy_outputs: usize,
    ) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            result,
            dummy_outputs,
        });
    }

    pub fn add_success_expectation(
        &self,
        arg_pattern: &str,
        events: Vec<FfmpegEvent>,
        dummy_outputs: usize,
    ) {
        let process = MockFfmpegProcess {
            events_to_emit: Rc::new(RefCell::new(events)),
            exit_status: exit_status(0),
        };
        self.add_expectation(arg_pattern, Ok(process), dummy_outputs);
    }

    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, error: CoreError) {
        self.add_expectation(arg_pattern, Err(error), 0);
    }

    pub fn add_exit_error_expectation(
        &self,
        arg_pattern: &str,
        events: Vec<FfmpegEvent>,
        exit_code: i32,
    ) {
        let process = MockFfmpegProcess {
            events_to_emit: Rc::new(RefCell::new(events)),
            exit_status: exit_status(exit_code),
        };
        self.add_expectation(arg_pattern, Ok(process), 0);
    }

    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls.borrow().clone()
    }

    fn create_dummy_outputs(output: &str, count: usize) {
        let paths: Vec<PathBuf> = if output.contains("%03d") {
            (0..count)
                .map(|i| PathBuf::from(output.replace("%03d", &format!("{i:03}"))))
                .collect()
        } else if output.contains("%d") {
            (0..count)
                .map(|i| PathBuf::from(output.replace("%d", &i.to_string())))
                .collect()
        } else if count > 0 {
            vec![PathBuf::from(output)]
        } else {
            Vec::new()
        };

        for path in paths {
            if let Some(parent) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    log::error!("MockFfmpegSpawner failed to create parent dir {:?}: {}", parent, e);
                }
            }
            match std::fs::File::create(&path) {
                Ok(_) => log::debug!("MockFfmpegSpawner created dummy output file: {:?}", path),
                Err(e) => log::error!(
                    "MockFfmpegSpawner failed to create dummy output file {:?}: {}",
                    path,
                    e
                ),
            }
        }
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, cmd: &TranscodeCommand) -> CoreResult<Self::Process> {
        let args = cmd.to_args();
        self.received_calls.borrow_mut().push(args.clone());
        let output = args.last().cloned().unwrap_or_default();

        let expectation = {
            let mut expectations = self.expectations.borrow_mut();
            expectations
                .iter()
                .position(|exp| args.iter().any(|arg| arg.contains(&exp.arg_pattern)))
                .map(|index| expectations.remove(index))
        };

        match expectation {
            Some(expectation) => {
                log::debug!(
                    "MockFfmpegSpawner: Matched expectation with pattern '{}'",
                    expectation.arg_pattern
                );
                if expectation.result.is_ok() {
                    Self::create_dummy_outputs(&output, expectation.dummy_outputs);
                }
                expectation.result
            }
            None if self.strict => {
                panic!("MockFfmpegSpawner: No expectation found for command args: {:?}", args);
            }
            None => {
                Self::create_dummy_outputs(&output, 1);
                Ok(MockFfmpegProcess {
                    events_to_emit: Rc::new(RefCell::new(Vec::new())),
                    exit_status: exit_status(0),
                })
            }
        }
    }
}

/// Mock implementation of FfprobeExecutor.
///
/// Results are keyed by input reference; a key also matches any input that
/// ends with `/<key>`, so tests can register plain file names.
#[derive(Clone, Default)]
pub struct MockFfprobeExecutor {
    results: Rc<RefCell<HashMap<String, VideoMetadata>>>,
    failures: Rc<RefCell<HashMap<String, String>>>,
    default: Rc<RefCell<Option<VideoMetadata>>>,
    calls: Rc<Cell<usize>>,
}

impl MockFfprobeExecutor {
    pub fn new() -> Self {
        Default::default()
    }

    /// Probe result for every input without a specific expectation.
    pub fn with_default(metadata: VideoMetadata) -> Self {
        let mock = Self::new();
        *mock.default.borrow_mut() = Some(metadata);
        mock
    }

    pub fn expect_metadata(&self, input: &str, metadata: VideoMetadata) {
        self.results.borrow_mut().insert(input.to_string(), metadata);
    }

    pub fn expect_failure(&self, input: &str, message: &str) {
        self.failures
            .borrow_mut()
            .insert(input.to_string(), message.to_string());
    }

    /// Number of probe calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    fn lookup<'m, T>(map: &'m HashMap<String, T>, input: &str) -> Option<&'m T> {
        map.get(input).or_else(|| {
            map.iter()
                .find(|(key, _)| input.ends_with(&format!("/{key}")))
                .map(|(_, value)| value)
        })
    }
}

impl FfprobeExecutor for MockFfprobeExecutor {
    fn probe(&self, input: &str) -> CoreResult<VideoMetadata> {
        self.calls.set(self.calls.get() + 1);
        log::debug!("MockFfprobeExecutor::probe called for: {input}");

        if let Some(message) = Self::lookup(&self.failures.borrow(), input) {
            return Err(CoreError::Probe {
                source_ref: input.to_string(),
                message: message.clone(),
            });
        }
        if let Some(metadata) = Self::lookup(&self.results.borrow(), input) {
            return Ok(metadata.clone());
        }
        self.default.borrow().clone().ok_or_else(|| CoreError::Probe {
            source_ref: input.to_string(),
            message: "MockFfprobeExecutor: no expectation set".to_string(),
        })
    }
}
