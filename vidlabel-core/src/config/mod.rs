//! Configuration structures and constants for the vidlabel-core library.
//!
//! `CoreConfig` controls where flushed outputs are staged, how long presigned
//! references for remote videos stay valid, and a couple of behavioural
//! switches for the label accumulator.

mod builder;
mod utils;

use std::path::PathBuf;
use std::time::Duration;

pub use builder::CoreConfigBuilder;
pub use utils::{get_env_bool, get_env_path, get_env_u64};

// Default constants

/// Lifetime of presigned URLs generated for remote videos, in seconds.
pub const DEFAULT_PRESIGN_TTL_SECS: u64 = 60;

/// Prefix of scratch staging directories created by the orchestrator.
pub const STAGING_DIR_PREFIX: &str = "vidlabel_";

/// Environment variable overriding the staging directory.
pub const ENV_STAGING_DIR: &str = "VIDLABEL_STAGING_DIR";
/// Environment variable overriding the presign lifetime (seconds).
pub const ENV_PRESIGN_TTL_SECS: &str = "VIDLABEL_PRESIGN_TTL_SECS";
/// Environment variable enabling audio re-timing on frame-rate changes.
pub const ENV_RETIME_AUDIO: &str = "VIDLABEL_RETIME_AUDIO";
/// Environment variable controlling `-y` on transcoder invocations.
pub const ENV_OVERWRITE: &str = "VIDLABEL_OVERWRITE";

/// Main configuration structure for the vidlabel-core library.
///
/// ```rust
/// use vidlabel_core::config::CoreConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .staging_dir(PathBuf::from("/tmp/vidlabel-out"))
///     .presign_ttl_secs(120)
///     .retime_audio_on_fps_change(true)
///     .build();
/// assert_eq!(config.presign_ttl().as_secs(), 120);
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Persistent staging directory. When unset, outputs go to the directory
    /// recorded by `load_local`, or to a scratch directory created on demand.
    pub staging_dir: Option<PathBuf>,

    /// Parent directory for scratch staging directories (defaults to the
    /// system temp dir).
    pub scratch_parent: Option<PathBuf>,

    /// Lifetime of presigned references for remote videos.
    pub presign_ttl_secs: u64,

    /// Whether `change_fps` also resamples audio timestamps to follow the
    /// new video timing.
    pub retime_audio_on_fps_change: bool,

    /// Pass `-y` to ffmpeg so existing outputs are replaced.
    pub overwrite: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            staging_dir: None,
            scratch_parent: None,
            presign_ttl_secs: DEFAULT_PRESIGN_TTL_SECS,
            retime_audio_on_fps_change: false,
            overwrite: true,
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by `VIDLABEL_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            staging_dir: get_env_path(ENV_STAGING_DIR),
            scratch_parent: defaults.scratch_parent,
            presign_ttl_secs: get_env_u64(ENV_PRESIGN_TTL_SECS, defaults.presign_ttl_secs),
            retime_audio_on_fps_change: get_env_bool(
                ENV_RETIME_AUDIO,
                defaults.retime_audio_on_fps_change,
            ),
            overwrite: get_env_bool(ENV_OVERWRITE, defaults.overwrite),
        }
    }

    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.presign_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert!(config.staging_dir.is_none());
        assert_eq!(config.presign_ttl_secs, DEFAULT_PRESIGN_TTL_SECS);
        assert!(!config.retime_audio_on_fps_change);
        assert!(config.overwrite);
    }

    #[test]
    fn test_env_var_overrides() {
        // Edition 2024 marks env mutation unsafe; this is the only test touching these keys.
        unsafe {
            std::env::set_var(ENV_STAGING_DIR, "/tmp/vidlabel-env-test");
            std::env::set_var(ENV_PRESIGN_TTL_SECS, "300");
            std::env::set_var(ENV_RETIME_AUDIO, "true");
            std::env::set_var(ENV_OVERWRITE, "0");
        }

        let config = CoreConfig::from_env();

        unsafe {
            std::env::remove_var(ENV_STAGING_DIR);
            std::env::remove_var(ENV_PRESIGN_TTL_SECS);
            std::env::remove_var(ENV_RETIME_AUDIO);
            std::env::remove_var(ENV_OVERWRITE);
        }

        assert_eq!(config.staging_dir, Some(PathBuf::from("/tmp/vidlabel-env-test")));
        assert_eq!(config.presign_ttl_secs, 300);
        assert!(config.retime_audio_on_fps_change);
        assert!(!config.overwrite);
    }
}
