//! Blob storage client.
//!
//! Audio artifacts are write-once blobs under session-scoped keys; reads
//! go through time-limited signed URLs so the client never needs storage
//! credentials.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::schema::StorageConfig;
use crate::services::body_snippet;

/// Write-once blob storage with signed read access.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`. Overwrites are not expected; keys carry a
    /// fresh UUID per artifact.
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Produce a signed GET URL for `key`, valid for `expires_in`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String>;

    /// Stable URI of the stored object, for handing to sibling services.
    fn object_uri(&self, key: &str) -> String;
}

/// Blob store talking to an S3-style HTTP storage gateway.
pub struct HttpBlobStore {
    base_url: String,
    bucket: String,
    api_key: String,
    client: Client,
}

impl HttpBlobStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            api_key: config.api_key.clone(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let url = self.object_uri(key);
        debug!("Storing {} bytes at {}", bytes.len(), url);

        let response = self
            .client
            .put(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("blob upload to {} failed", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!(
                "blob upload rejected (HTTP {}): {}",
                status,
                body_snippet(&body)
            );
        }
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String> {
        let url = format!("{}/presign", self.object_uri(key));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({ "expiresIn": expires_in.as_secs() }))
            .send()
            .await
            .with_context(|| format!("presign request to {} failed", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!(
                "presign rejected (HTTP {}): {}",
                status,
                body_snippet(&body)
            );
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .context("presign response was not JSON")?;
        parsed
            .get("url")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .context("presign response missing url field")
    }

    fn object_uri(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, key)
    }
}
