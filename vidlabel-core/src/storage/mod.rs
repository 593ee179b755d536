// ============================================================================
// vidlabel-core/src/storage/mod.rs
// ============================================================================
//
// OBJECT STORAGE: Bucket/Key Access for Remote Videos
//
// The orchestrator talks to object storage only through the `ObjectStore`
// trait, injected at construction. Two implementations ship with the crate:
//
// - `S3ObjectStore` (feature `s3`): AWS SDK client driven on a private
//   current-thread runtime so the rest of the pipeline stays synchronous.
// - `FsObjectStore`: buckets are sub-directories of a root directory. Used by
//   tests and for working against a local mirror of a bucket.

mod error;
mod fs;
#[cfg(feature = "s3")]
mod s3;

use std::path::Path;
use std::time::Duration;

pub use error::{StorageError, StorageResult};
pub use fs::FsObjectStore;
#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;

/// Blocking interface to a bucket/key object store.
pub trait ObjectStore {
    /// Lists every key under `prefix`, in the order the store returns them.
    /// The listing may include the prefix marker object itself.
    fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>>;

    /// Fetches the full body of an object.
    fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Uploads a local file to `bucket/key`.
    fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> StorageResult<()>;

    /// Returns a time-limited reference the transcoder and prober can read
    /// the object through.
    fn presigned_url(&self, bucket: &str, key: &str, ttl: Duration) -> StorageResult<String>;
}

/// Splits `s3://bucket/prefix` into `(bucket, prefix)`.
///
/// Returns `None` when the string is not an `s3://` URI or has no bucket.
pub fn parse_bucket_uri(uri: &str) -> Option<(String, String)> {
    let rest = uri.strip_prefix("s3://")?;
    let (bucket, prefix) = match rest.split_once('/') {
        Some((bucket, prefix)) => (bucket, prefix),
        None => (rest, ""),
    };
    if bucket.is_empty() {
        return None;
    }
    Some((bucket.to_string(), prefix.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_uri() {
        assert_eq!(
            parse_bucket_uri("s3://media/raw/"),
            Some(("media".to_string(), "raw/".to_string()))
        );
        assert_eq!(
            parse_bucket_uri("s3://media"),
            Some(("media".to_string(), String::new()))
        );
        assert_eq!(parse_bucket_uri("s3:///raw"), None);
        assert_eq!(parse_bucket_uri("/local/dir"), None);
    }
}
