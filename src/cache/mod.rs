//! Cache backends and the due-set cache built on them.
//!
//! The cache is an optimization only. Backends report failures as
//! [`CacheResult::Unavailable`] on reads and as [`CacheError`] on writes; the
//! callers decide how to degrade.

pub mod due_set;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use due_set::{DueSet, DueSetCache, DueSource};
pub use memory::MemoryCache;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Outcome of a cache read
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResult<T> {
    Hit(T),
    Miss,
    /// The backend could not answer; carries the reason
    Unavailable(String),
}

impl<T> CacheResult<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheResult::Hit(_))
    }
}

/// Key-value cache with per-entry expiry and an explicit connection lifecycle
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    fn is_connected(&self) -> bool;

    async fn get(&self, key: &str) -> CacheResult<String>;

    /// Store `value` under `key` for at most `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}
