//! Resource cache
//!
//! Remote query results keyed by resource kind, region, credential identity
//! and parameters. Concurrent identical queries share one remote call.

mod resource_cache;
pub mod types;


pub use resource_cache::ResourceCache;
pub use types::{CacheEntry, CacheKey, CacheStatistics, hash_params};
