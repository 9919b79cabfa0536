//! Remote lookups served through the resource cache

pub mod s3;

use crate::credentials::snapshot::CredentialSnapshot;
use crate::error::ToolkitResult;
use async_trait::async_trait;
use std::time::Duration;

pub use s3::{
    BUCKET_REGION_HEADER, BUCKET_REGION_KIND, BucketRegionLookup, HeadBucketClient,
    HeadBucketResponse, bucket_params,
};

/// A remote query whose results may be cached
///
/// `kind` names the resource and becomes part of every cache key, so it must
/// be unique per client type.
#[async_trait]
pub trait RemoteLookupClient: Send + Sync {
    type Output: Send + Sync + 'static;

    fn kind(&self) -> &str;

    /// Lifetime of cached results; `None` uses the cache default
    fn ttl(&self) -> Option<Duration> {
        None
    }

    async fn fetch(
        &self,
        region: &str,
        credentials: &CredentialSnapshot,
        params: &serde_json::Value,
    ) -> ToolkitResult<Self::Output>;
}
