//! Collaborators needed to read a video: the prober and, for remote videos,
//! the object store that issues presigned references.

use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::external::FfprobeExecutor;
use crate::media::video::{MediaSource, Video};
use crate::storage::ObjectStore;

#[derive(Clone, Copy)]
pub struct MediaContext<'a> {
    pub probe: &'a dyn FfprobeExecutor,
    pub store: Option<&'a dyn ObjectStore>,
    pub presign_ttl: Duration,
}

impl<'a> MediaContext<'a> {
    pub fn new(probe: &'a dyn FfprobeExecutor) -> Self {
        Self {
            probe,
            store: None,
            presign_ttl: Duration::from_secs(crate::config::DEFAULT_PRESIGN_TTL_SECS),
        }
    }

    pub fn with_store(mut self, store: &'a dyn ObjectStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_presign_ttl(mut self, ttl: Duration) -> Self {
        self.presign_ttl = ttl;
        self
    }

    /// Input reference ffmpeg and ffprobe can open for `video`: the local
    /// path, or a presigned URL generated now for remote objects.
    pub fn locate(&self, video: &Video) -> CoreResult<String> {
        match video.source() {
            MediaSource::Local(path) => Ok(path.to_string_lossy().into_owned()),
            MediaSource::Remote { bucket, key } => {
                let store = self.store.ok_or_else(|| {
                    CoreError::Config(format!(
                        "remote video {} needs an object store",
                        video.display_name()
                    ))
                })?;
                Ok(store.presigned_url(bucket, key, self.presign_ttl)?)
            }
        }
    }
}
