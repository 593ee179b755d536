// ============================================================================
// vidlabel-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent construction of CoreConfig with the library defaults filled in.

use std::path::PathBuf;

use super::CoreConfig;

/// Builder for creating CoreConfig instances.
#[derive(Debug, Clone)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl Default for CoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreConfigBuilder {
    /// Creates a builder seeded with `CoreConfig::default()`.
    pub fn new() -> Self {
        Self {
            config: CoreConfig::default(),
        }
    }

    /// Starts from the environment-derived configuration instead of the defaults.
    pub fn from_env() -> Self {
        Self {
            config: CoreConfig::from_env(),
        }
    }

    /// Sets a persistent staging directory for flushed outputs.
    pub fn staging_dir(mut self, dir: PathBuf) -> Self {
        self.config.staging_dir = Some(dir);
        self
    }

    /// Sets the parent directory for scratch staging directories.
    pub fn scratch_parent(mut self, dir: PathBuf) -> Self {
        self.config.scratch_parent = Some(dir);
        self
    }

    pub fn presign_ttl_secs(mut self, secs: u64) -> Self {
        self.config.presign_ttl_secs = secs;
        self
    }

    pub fn retime_audio_on_fps_change(mut self, enabled: bool) -> Self {
        self.config.retime_audio_on_fps_change = enabled;
        self
    }

    pub fn overwrite(mut self, enabled: bool) -> Self {
        self.config.overwrite = enabled;
        self
    }

    /// Builds the CoreConfig.
    pub fn build(self) -> CoreConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = CoreConfigBuilder::new()
            .staging_dir(PathBuf::from("/data/out"))
            .scratch_parent(PathBuf::from("/scratch"))
            .presign_ttl_secs(900)
            .retime_audio_on_fps_change(true)
            .overwrite(false)
            .build();

        assert_eq!(config.staging_dir, Some(PathBuf::from("/data/out")));
        assert_eq!(config.scratch_parent, Some(PathBuf::from("/scratch")));
        assert_eq!(config.presign_ttl().as_secs(), 900);
        assert!(config.retime_audio_on_fps_change);
        assert!(!config.overwrite);
    }
}
