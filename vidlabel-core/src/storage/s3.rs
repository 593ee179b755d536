//! S3 object store.
//!
//! The SDK is async; the pipeline is not. Each call is driven to completion on
//! a current-thread tokio runtime owned by the store.

use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use log::{debug, info};
use tokio::runtime::Runtime;

use super::{ObjectStore, StorageError, StorageResult};

pub struct S3ObjectStore {
    runtime: Runtime,
    client: Client,
}

impl S3ObjectStore {
    /// Builds a client from the standard AWS environment (credentials chain,
    /// region, profile).
    pub fn from_env() -> StorageResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::config_error(format!("tokio runtime: {e}")))?;
        let sdk_config = runtime.block_on(aws_config::defaults(BehaviorVersion::latest()).load());
        let client = Client::new(&sdk_config);
        Ok(Self { runtime, client })
    }

    /// Wraps an already configured client.
    pub fn with_client(client: Client) -> StorageResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::config_error(format!("tokio runtime: {e}")))?;
        Ok(Self { runtime, client })
    }
}

impl ObjectStore for S3ObjectStore {
    fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        self.runtime.block_on(async {
            let mut keys = Vec::new();
            let mut continuation_token: Option<String> = None;

            loop {
                let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
                if let Some(token) = continuation_token {
                    request = request.continuation_token(token);
                }

                let response = request
                    .send()
                    .await
                    .map_err(|e| StorageError::ListFailed(e.to_string()))?;

                if let Some(ref contents) = response.contents {
                    keys.extend(contents.iter().filter_map(|obj| obj.key.clone()));
                }

                if response.is_truncated() == Some(true) {
                    continuation_token = response.next_continuation_token;
                } else {
                    break;
                }
            }

            debug!("Listed {} object(s) under s3://{}/{}", keys.len(), bucket, prefix);
            Ok(keys)
        })
    }

    fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.runtime.block_on(async {
            let response = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| {
                    if e.to_string().contains("NoSuchKey") {
                        StorageError::not_found(key)
                    } else {
                        StorageError::download_failed(e.to_string())
                    }
                })?;

            let bytes = response
                .body
                .collect()
                .await
                .map_err(|e| StorageError::download_failed(e.to_string()))?
                .into_bytes()
                .to_vec();
            Ok(bytes)
        })
    }

    fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> StorageResult<()> {
        self.runtime.block_on(async {
            let body = ByteStream::from_path(local_path)
                .await
                .map_err(|e| StorageError::upload_failed(e.to_string()))?;

            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(|e| StorageError::upload_failed(e.to_string()))?;

            info!("Uploaded {} to s3://{}/{}", local_path.display(), bucket, key);
            Ok(())
        })
    }

    fn presigned_url(&self, bucket: &str, key: &str, ttl: Duration) -> StorageResult<String> {
        self.runtime.block_on(async {
            let presign_config = PresigningConfig::expires_in(ttl)
                .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

            let presigned = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .presigned(presign_config)
                .await
                .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

            Ok(presigned.uri().to_string())
        })
    }
}
