//! Caching primitives
//!
//! A fixed-capacity, thread-safe LRU memoizer shared by the markup parser
//! and the compatibility shim.

pub mod lru;

pub use lru::LruCache;

/// Result type for cache construction
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised by cache construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Capacity must be at least one entry
    #[error("Cache capacity must be at least 1")]
    ZeroCapacity,
}
