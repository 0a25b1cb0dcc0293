//! Cache infrastructure - Parsed document cache

mod document_cache;

pub use document_cache::{CacheOutcome, CacheSnapshot, DocumentCache, DocumentCacheConfig};
