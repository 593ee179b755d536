//! Directory-backed object store.
//!
//! Bucket `b` maps to `<root>/b`; key `a/b.mp4` maps to `<root>/b/a/b.mp4`.
//! Presigned references are plain file paths, which ffmpeg and ffprobe read
//! directly.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use log::debug;

use super::{ObjectStore, StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<bucket>`. The bucket must be a single plain path segment.
    fn bucket_dir(&self, bucket: &str) -> StorageResult<PathBuf> {
        let mut components = Path::new(bucket).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(bucket)),
            _ => Err(StorageError::InvalidBucket(bucket.to_string())),
        }
    }

    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        let bucket_dir = self.bucket_dir(bucket)?;
        let key_path = Path::new(key);
        let escapes = key_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(bucket_dir.join(key_path))
    }
}

fn collect_keys(base: &Path, dir: &Path, keys: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_keys(base, &path, keys)?;
        } else if let Ok(relative) = path.strip_prefix(base) {
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            keys.push(key);
        }
    }
    Ok(())
}

impl ObjectStore for FsObjectStore {
    fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let bucket_dir = self.bucket_dir(bucket)?;
        if !bucket_dir.is_dir() {
            return Err(StorageError::ListFailed(format!(
                "bucket directory {} does not exist",
                bucket_dir.display()
            )));
        }

        let mut keys = Vec::new();
        collect_keys(&bucket_dir, &bucket_dir, &mut keys)
            .map_err(|e| StorageError::ListFailed(e.to_string()))?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        debug!("Listed {} object(s) under {}/{}", keys.len(), bucket, prefix);
        Ok(keys)
    }

    fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        if !path.is_file() {
            return Err(StorageError::not_found(format!("{bucket}/{key}")));
        }
        std::fs::read(&path).map_err(|e| StorageError::download_failed(e.to_string()))
    }

    fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(local_path, &path)
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;
        debug!("Stored {} as {}/{}", local_path.display(), bucket, key);
        Ok(())
    }

    fn presigned_url(&self, bucket: &str, key: &str, _ttl: Duration) -> StorageResult<String> {
        let path = self.object_path(bucket, key)?;
        if !path.is_file() {
            return Err(StorageError::not_found(format!("{bucket}/{key}")));
        }
        Ok(path.to_string_lossy().into_owned())
    }
}
