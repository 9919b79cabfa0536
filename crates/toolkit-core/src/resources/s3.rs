//! Bucket region discovery
//!
//! S3 reports a bucket's home region in the `x-amz-bucket-region` header of a
//! HEAD request, including on redirect and access-denied responses.

use super::RemoteLookupClient;
use crate::credentials::snapshot::CredentialSnapshot;
use crate::error::{ToolkitError, ToolkitResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

pub const BUCKET_REGION_HEADER: &str = "x-amz-bucket-region";
pub const BUCKET_REGION_KIND: &str = "s3.bucket_region";

/// Status and headers of a HEAD bucket response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadBucketResponse {
    pub status: u16,
    /// Header names are compared case-insensitively
    pub headers: HashMap<String, String>,
}

impl HeadBucketResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Transport for HEAD bucket calls
///
/// Any HTTP response, successful or not, is returned as `Ok`; only transport
/// failures are errors.
#[async_trait]
pub trait HeadBucketClient: Send + Sync {
    async fn head_bucket(
        &self,
        region: &str,
        credentials: &CredentialSnapshot,
        bucket: &str,
    ) -> ToolkitResult<HeadBucketResponse>;
}

/// Looks up the region a bucket lives in
pub struct BucketRegionLookup<C> {
    client: C,
    ttl: Option<Duration>,
}

impl<C: HeadBucketClient> BucketRegionLookup<C> {
    pub fn new(client: C) -> Self {
        Self { client, ttl: None }
    }

    /// Cache results for `ttl` instead of the cache default
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Request parameters for `bucket`
pub fn bucket_params(bucket: &str) -> serde_json::Value {
    json!({ "bucket": bucket })
}

#[async_trait]
impl<C: HeadBucketClient> RemoteLookupClient for BucketRegionLookup<C> {
    type Output = String;

    fn kind(&self) -> &str {
        BUCKET_REGION_KIND
    }

    fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    async fn fetch(
        &self,
        region: &str,
        credentials: &CredentialSnapshot,
        params: &serde_json::Value,
    ) -> ToolkitResult<String> {
        let bucket = params
            .get("bucket")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolkitError::Serialization("'bucket' parameter is required".into()))?;

        let response = self.client.head_bucket(region, credentials, bucket).await?;
        match response.header(BUCKET_REGION_HEADER) {
            Some(bucket_region) => {
                debug!(bucket = %bucket, region = %bucket_region, status = response.status, "Bucket region found");
                Ok(bucket_region.to_string())
            }
            None => Err(ToolkitError::transient(
                "HeadBucket",
                format!(
                    "response for bucket '{}' (status {}) has no {} header",
                    bucket, response.status, BUCKET_REGION_HEADER
                ),
            )),
        }
    }
}
