// ============================================================================
// vidlabel-core/src/processing/mod.rs
// ============================================================================
//
// BATCH ORCHESTRATION: Load, Label, Flush, Upload, Clean Up
//
// `Processor` owns the collaborators (ffmpeg spawner, prober, optional object
// store) and the staging directory. The caller owns the `Vec<Video>` and
// threads it through:
//
//     let videos = processor.load_local(dir)?;
//     let videos = processor.labeler().grayscale(videos);
//     let mut videos = videos;
//     let outcome = processor.flush(&mut videos, None)?;
//     processor.upload(&outcome.videos, "bucket", "processed/")?;
//     processor.cleanup(None)?;
//
// Staging directory resolution for a flush, first match wins:
//   1. path passed to `flush`
//   2. `CoreConfig::staging_dir`
//   3. directory recorded by the last `load_local`
//   4. scratch directory created on demand (removed on drop or `cleanup`)

pub mod extractor;
pub mod labeler;
pub mod quality;
pub mod reporting;
pub mod synthesizer;

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, error, info, warn};
use tempfile::TempDir;

use crate::config::CoreConfig;
use crate::discovery::find_processable_files;
use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegSpawner, FfprobeExecutor};
use crate::media::{MediaContext, Video};
use crate::storage::ObjectStore;
use crate::temp_files::create_staging_dir;
use crate::utils::get_filename_safe;

pub use extractor::Extractor;
pub use labeler::{LabelFailure, LabelOp, Labeler, Resolution};
pub use quality::QualityMeter;
pub use reporting::{FlushFailure, FlushOutcome, FlushSummary};
pub use synthesizer::{Synthesizer, TranscodeCommand};

pub struct Processor<S: FfmpegSpawner, P: FfprobeExecutor> {
    config: CoreConfig,
    spawner: S,
    probe: P,
    store: Option<Box<dyn ObjectStore>>,
    loaded_dir: Option<PathBuf>,
    last_staging: Option<PathBuf>,
    scratch: Option<TempDir>,
}

impl<S: FfmpegSpawner, P: FfprobeExecutor> Processor<S, P> {
    pub fn new(config: CoreConfig, spawner: S, probe: P) -> Self {
        Self {
            config,
            spawner,
            probe,
            store: None,
            loaded_dir: None,
            last_staging: None,
            scratch: None,
        }
    }

    /// Attaches the object store used for remote videos and uploads.
    pub fn with_store(mut self, store: Box<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    fn store(&self) -> CoreResult<&dyn ObjectStore> {
        self.store
            .as_deref()
            .ok_or_else(|| CoreError::Config("no object store configured".to_string()))
    }

    pub fn media_context(&self) -> MediaContext<'_> {
        let ctx = MediaContext::new(&self.probe).with_presign_ttl(self.config.presign_ttl());
        match self.store.as_deref() {
            Some(store) => ctx.with_store(store),
            None => ctx,
        }
    }

    pub fn labeler(&self) -> Labeler<'_> {
        Labeler::new(self.media_context()).with_retime_audio(self.config.retime_audio_on_fps_change)
    }

    pub fn synthesizer(&self) -> Synthesizer<'_, S> {
        Synthesizer::new(&self.spawner, self.media_context()).with_overwrite(self.config.overwrite)
    }

    pub fn extractor(&self) -> Extractor<'_, S> {
        Extractor::new(&self.spawner, self.media_context()).with_overwrite(self.config.overwrite)
    }

    pub fn quality(&self) -> QualityMeter<'_, S> {
        QualityMeter::new(&self.spawner, self.media_context())
    }

    // ---- Loading ----

    /// One video per regular file in `path` (non-recursive, sorted by name),
    /// or a single video when `path` is a file. The containing directory
    /// becomes the default flush target.
    pub fn load_local(&mut self, path: &Path) -> CoreResult<Vec<Video>> {
        let (dir, files) = if path.is_dir() {
            (path.to_path_buf(), find_processable_files(path)?)
        } else if path.is_file() {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (dir, vec![path.to_path_buf()])
        } else {
            return Err(CoreError::PathError(format!(
                "input path {} does not exist",
                path.display()
            )));
        };

        let videos = files
            .into_iter()
            .map(Video::local)
            .collect::<CoreResult<Vec<_>>>()?;
        info!("Loaded {} local video(s) from {}", videos.len(), dir.display());
        self.loaded_dir = Some(dir);
        Ok(videos)
    }

    /// One remote video per object under `bucket/prefix`. The prefix marker
    /// object and other directory placeholders are skipped.
    pub fn load_remote(&self, bucket: &str, prefix: &str) -> CoreResult<Vec<Video>> {
        let keys = self.store()?.list(bucket, prefix)?;
        let mut videos = Vec::with_capacity(keys.len());
        for key in keys {
            if key == prefix || key.ends_with('/') {
                debug!("Skipping placeholder object {key}");
                continue;
            }
            videos.push(Video::remote(bucket, key, prefix)?);
        }
        info!("Loaded {} remote video(s) from s3://{}/{}", videos.len(), bucket, prefix);
        Ok(videos)
    }

    // ---- Staging ----

    /// Where a flush would write, without creating anything.
    fn planned_output_dir(&self, path: Option<&Path>) -> Option<PathBuf> {
        path.map(Path::to_path_buf)
            .or_else(|| self.config.staging_dir.clone())
            .or_else(|| self.loaded_dir.clone())
            .or_else(|| self.scratch.as_ref().map(|d| d.path().to_path_buf()))
    }

    fn output_dir(&mut self, path: Option<&Path>) -> CoreResult<PathBuf> {
        let dir = match self.planned_output_dir(path) {
            Some(dir) => dir,
            None => {
                let scratch = create_staging_dir(&self.config)?;
                let dir = scratch.path().to_path_buf();
                self.scratch = Some(scratch);
                dir
            }
        };
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    // ---- Flushing ----

    /// Commands a flush would run, in order. Nothing is executed or created.
    pub fn plan(&self, videos: &[Video], path: Option<&Path>) -> CoreResult<Vec<TranscodeCommand>> {
        let dir = self
            .planned_output_dir(path)
            .unwrap_or_else(|| std::env::temp_dir().join(format!("{}scratch", crate::config::STAGING_DIR_PREFIX)));
        let synthesizer = self.synthesizer();
        videos
            .iter()
            .map(|video| synthesizer.command_for(video, &dir))
            .collect()
    }

    /// Executes the pending labels of every video, one ffmpeg run each, in
    /// order. A failing video is recorded and the batch continues; only
    /// failures that would hit every video (ffmpeg cannot be started) abort.
    pub fn flush(&mut self, videos: &mut [Video], path: Option<&Path>) -> CoreResult<FlushOutcome> {
        let dir = self.output_dir(path)?;
        self.last_staging = Some(dir.clone());
        let started = Instant::now();

        let mut produced = Vec::new();
        let mut failures = Vec::new();
        {
            let synthesizer = self.synthesizer();
            for video in videos.iter_mut() {
                match synthesizer.execute(video, &dir) {
                    Ok(outputs) => produced.extend(outputs),
                    Err(err) if !err.is_per_video() => return Err(err),
                    Err(err) => {
                        error!("Flush failed for {}: {err}", video.display_name());
                        failures.push(FlushFailure {
                            video: video.display_name(),
                            error: err,
                        });
                    }
                }
            }
        }

        let outcome = FlushOutcome {
            videos: produced,
            failures,
            output_dir: dir,
            elapsed: started.elapsed(),
        };
        info!("Flush finished: {}", outcome.describe());
        Ok(outcome)
    }

    // ---- Transfer ----

    /// Uploads every local video to `bucket` under `prefix + file name`.
    /// Local files are kept. Returns the keys written.
    pub fn upload(&self, videos: &[Video], bucket: &str, prefix: &str) -> CoreResult<Vec<String>> {
        let store = self.store()?;
        let mut keys = Vec::with_capacity(videos.len());
        for video in videos {
            let Some(path) = video.local_path() else {
                warn!("Skipping upload of remote video {}", video.display_name());
                continue;
            };
            let key = format!("{prefix}{}", get_filename_safe(path)?);
            store.put_object(bucket, &key, path)?;
            info!("Uploaded {} to s3://{}/{}", path.display(), bucket, key);
            keys.push(key);
        }
        Ok(keys)
    }

    /// Copies remote videos into `dir` and returns local videos for them.
    /// Local videos are passed through unchanged.
    pub fn download(&self, videos: &[Video], dir: &Path) -> CoreResult<Vec<Video>> {
        std::fs::create_dir_all(dir)?;
        let mut local = Vec::with_capacity(videos.len());
        for video in videos {
            match video.source() {
                crate::media::MediaSource::Local(path) => local.push(Video::local(path.clone())?),
                crate::media::MediaSource::Remote { bucket, key } => {
                    let bytes = self.store()?.get_object(bucket, key)?;
                    let target = dir.join(video.title());
                    std::fs::write(&target, bytes)?;
                    debug!("Downloaded s3://{}/{} to {}", bucket, key, target.display());
                    local.push(Video::local(target)?);
                }
            }
        }
        info!("Downloaded {} video(s) to {}", local.len(), dir.display());
        Ok(local)
    }

    // ---- Cleanup ----

    /// Removes every file under the staging directory, then the directory.
    ///
    /// With no explicit `path`, the target is the last flush directory, unless
    /// that is the `load_local` input directory (never removed implicitly), in
    /// which case the scratch directory is used if one exists. Individual
    /// removal failures are logged and swallowed.
    pub fn cleanup(&mut self, path: Option<&Path>) -> CoreResult<()> {
        let scratch_path = self.scratch.as_ref().map(|d| d.path().to_path_buf());
        let target = match path {
            Some(p) => Some(p.to_path_buf()),
            None => self
                .last_staging
                .clone()
                .filter(|dir| Some(dir) != self.loaded_dir.as_ref())
                .or_else(|| scratch_path.clone()),
        };

        let Some(target) = target else {
            info!("Nothing to clean up");
            return Ok(());
        };

        remove_tree(&target);

        if scratch_path.as_ref() == Some(&target) {
            self.scratch = None;
        }
        if self.last_staging.as_ref() == Some(&target) {
            self.last_staging = None;
        }
        Ok(())
    }
}

/// Deletes the files of `dir` one by one, then the directory itself.
fn remove_tree(dir: &Path) {
    if !dir.exists() {
        warn!("Cleanup target {} does not exist", dir.display());
        return;
    }

    fn remove_files(dir: &Path, removed: &mut usize) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read {}: {e}", dir.display());
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                remove_files(&path, removed);
            } else if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to remove {}: {e}", path.display());
            } else {
                *removed += 1;
            }
        }
    }

    let mut removed = 0usize;
    remove_files(dir, &mut removed);
    if let Err(e) = std::fs::remove_dir_all(dir) {
        warn!("Failed to remove directory {}: {e}", dir.display());
    }
    info!("Cleaned up {} file(s) in {}", removed, dir.display());
}
