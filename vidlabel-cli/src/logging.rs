// ============================================================================
// vidlabel-cli/src/logging.rs
// ============================================================================
//
// LOGGING: env_logger setup for the vidlabel binary
//
// Library code logs through the `log` facade; this module installs the
// `env_logger` backend with a timestamped, level-tagged format.
//
// USAGE:
// - RUST_LOG=info (default): normal operation logs
// - RUST_LOG=debug or --verbose: ffmpeg command lines and per-step detail
// - --log-dir DIR: the same lines are also written to DIR/vidlabel_<timestamp>.log

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use env_logger::{Builder, Env, Target};
use log::Level;
use owo_colors::OwoColorize;

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Log file for a run started now.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("vidlabel_{}.log", get_timestamp()))
}

/// Writes every log line to stderr and to the run's log file.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn level_tag(level: Level, colored: bool) -> String {
    let tag = format!("{level:<5}");
    if !colored {
        return tag;
    }
    match level {
        Level::Error => tag.bright_red().bold().to_string(),
        Level::Warn => tag.yellow().to_string(),
        Level::Info => tag.green().to_string(),
        Level::Debug => tag.blue().to_string(),
        Level::Trace => tag.magenta().to_string(),
    }
}

/// Installs the global logger. Returns the log file path when `log_dir` is set.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    let default_filter = if verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_filter));

    // Plain tags when a file receives the same bytes.
    let colored = log_dir.is_none();
    builder.format(move |buf, record| {
        writeln!(
            buf,
            "{} {} {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            level_tag(record.level(), colored),
            record.args()
        )
    });

    let log_path = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory '{}'", dir.display()))?;
            let path = log_file_path(dir);
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file '{}'", path.display()))?;
            builder.target(Target::Pipe(Box::new(TeeWriter { file })));
            Some(path)
        }
        None => None,
    };

    builder.try_init().context("Failed to initialize logger")?;
    log::debug!("Logger initialized");
    Ok(log_path)
}
